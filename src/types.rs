//! Node and edge type codes.
//!
//! Graphs store node and edge types as small integers. For molecules a node
//! type packs an element, an aromaticity flag and a formal charge into one
//! `u32`; an edge type is one of the bond codes below, optionally tagged
//! with [`Bonds::RING`]. Before mining, node types are recoded by frequency
//! with a [`Recoder`] so that code order is search order.

use std::{collections::HashMap, fmt::Display, str::FromStr};

/// Maps human-readable type names to integer codes and back.
///
/// Fixed registries (chemical elements, bond symbols) ignore [`TypeMgr::add`]
/// for unknown names.
pub trait TypeMgr {
    /// Register `name` (if the registry allows it) and return its code.
    fn add(&mut self, name: &str) -> Option<u32> {
        self.code(name)
    }

    /// Return the code of `name`, if known.
    fn code(&self, name: &str) -> Option<u32>;

    /// Return the name of `code`, if known.
    fn name(&self, code: u32) -> Option<String>;

    /// Whether the set of known types is fixed.
    fn is_fixed(&self) -> bool {
        true
    }
}

/// Thrown by [`Element::from_str`] if the string does not represent a valid
/// chemical element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseElementError;

macro_rules! periodic_table {
    ( $(($element:ident, $name:literal),)* ) => {
        /// Represents a chemical element. Variants are in order of atomic
        /// number.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Element {
            $( $element, )*
        }

        impl Element {
            const ALL: &'static [Element] = &[ $( Element::$element, )* ];

            /// Return the element symbol.
            pub fn symbol(&self) -> &'static str {
                match &self {
                    $( Element::$element => $name, )*
                }
            }
        }

        impl FromStr for Element {
            type Err = ParseElementError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $name => Ok(Element::$element), )*
                    _ => Err(ParseElementError),
                }
            }
        }
    };
}

periodic_table!(
    (Hydrogen, "H"),
    (Helium, "He"),
    (Lithium, "Li"),
    (Beryllium, "Be"),
    (Boron, "B"),
    (Carbon, "C"),
    (Nitrogen, "N"),
    (Oxygen, "O"),
    (Fluorine, "F"),
    (Neon, "Ne"),
    (Sodium, "Na"),
    (Magnesium, "Mg"),
    (Aluminum, "Al"),
    (Silicon, "Si"),
    (Phosphorus, "P"),
    (Sulfur, "S"),
    (Chlorine, "Cl"),
    (Argon, "Ar"),
    (Potassium, "K"),
    (Calcium, "Ca"),
    (Scandium, "Sc"),
    (Titanium, "Ti"),
    (Vanadium, "V"),
    (Chromium, "Cr"),
    (Manganese, "Mn"),
    (Iron, "Fe"),
    (Cobalt, "Co"),
    (Nickel, "Ni"),
    (Copper, "Cu"),
    (Zinc, "Zn"),
    (Gallium, "Ga"),
    (Germanium, "Ge"),
    (Arsenic, "As"),
    (Selenium, "Se"),
    (Bromine, "Br"),
    (Krypton, "Kr"),
    (Rubidium, "Rb"),
    (Strontium, "Sr"),
    (Yttrium, "Y"),
    (Zirconium, "Zr"),
    (Niobium, "Nb"),
    (Molybdenum, "Mo"),
    (Technetium, "Tc"),
    (Ruthenium, "Ru"),
    (Rhodium, "Rh"),
    (Palladium, "Pd"),
    (Silver, "Ag"),
    (Cadmium, "Cd"),
    (Indium, "In"),
    (Tin, "Sn"),
    (Antimony, "Sb"),
    (Tellurium, "Te"),
    (Iodine, "I"),
    (Xenon, "Xe"),
    (Cesium, "Cs"),
    (Barium, "Ba"),
    (Lanthanum, "La"),
    (Cerium, "Ce"),
    (Praseodymium, "Pr"),
    (Neodymium, "Nd"),
    (Promethium, "Pm"),
    (Samarium, "Sm"),
    (Europium, "Eu"),
    (Gadolinium, "Gd"),
    (Terbium, "Tb"),
    (Dysprosium, "Dy"),
    (Holmium, "Ho"),
    (Erbium, "Er"),
    (Thulium, "Tm"),
    (Ytterbium, "Yb"),
    (Lutetium, "Lu"),
    (Hafnium, "Hf"),
    (Tantalum, "Ta"),
    (Wolfram, "W"),
    (Rhenium, "Re"),
    (Osmium, "Os"),
    (Iridium, "Ir"),
    (Platinum, "Pt"),
    (Gold, "Au"),
    (Mercury, "Hg"),
    (Thallium, "Tl"),
    (Lead, "Pb"),
    (Bismuth, "Bi"),
    (Polonium, "Po"),
    (Astatine, "At"),
    (Radon, "Rn"),
    (Francium, "Fr"),
    (Radium, "Ra"),
    (Actinium, "Ac"),
    (Thorium, "Th"),
    (Protactinium, "Pa"),
    (Uranium, "U"),
    (Neptunium, "Np"),
    (Plutonium, "Pu"),
    (Americium, "Am"),
    (Curium, "Cm"),
    (Berkelium, "Bk"),
    (Californium, "Cf"),
    (Einsteinium, "Es"),
    (Fermium, "Fm"),
    (Mendelevium, "Md"),
    (Nobelium, "No"),
    (Lawrencium, "Lr"),
    (Rutherfordium, "Rf"),
    (Dubnium, "Db"),
    (Seaborgium, "Sg"),
    (Bohrium, "Bh"),
    (Hassium, "Hs"),
    (Meitnerium, "Mt"),
    (Darmstadtium, "Ds"),
    (Roentgenium, "Rg"),
    (Copernicium, "Cn"),
    (Nihonium, "Nh"),
    (Flerovium, "Fl"),
    (Moscovium, "Mc"),
    (Livermorium, "Lv"),
    (Tennessine, "Ts"),
    (Oganesson, "Og"),
);

impl Element {
    /// Return the atomic number (1 for hydrogen).
    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    /// Return the element with atomic number `n`.
    pub fn from_number(n: u32) -> Option<Element> {
        n.checked_sub(1)
            .and_then(|i| Element::ALL.get(i as usize))
            .copied()
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Atom type codes.
///
/// Bits 0..7 hold the atomic number, bit 7 the aromaticity flag and bits
/// 8..16 the formal charge as a signed byte. [`Atoms::CHAIN`] marks the
/// pseudo-node standing for a variable-length chain.
#[derive(Debug, Default, Copy, Clone)]
pub struct Atoms;

impl Atoms {
    pub const ELEMENT_MASK: u32 = 0x0000_007f;
    pub const AROMATIC: u32 = 0x0000_0080;
    pub const CHARGE_MASK: u32 = 0x0000_ff00;
    pub const CHAIN: u32 = 0x4000_0000;

    const CHARGE_SHIFT: u32 = 8;

    pub const HYDROGEN: u32 = 1;
    pub const CARBON: u32 = 6;

    /// Build an atom type from its parts.
    pub fn encode(element: Element, aromatic: bool, charge: i32) -> u32 {
        let mut t = element.number();
        if aromatic {
            t |= Self::AROMATIC;
        }
        t | Self::encode_charge(charge)
    }

    /// Encode `charge` into the charge bits (clamped to a signed byte).
    pub fn encode_charge(charge: i32) -> u32 {
        let c = charge.clamp(i8::MIN as i32, i8::MAX as i32) as i8 as u8;
        (c as u32) << Self::CHARGE_SHIFT
    }

    pub fn element(t: u32) -> Option<Element> {
        Element::from_number(t & Self::ELEMENT_MASK)
    }

    pub fn charge(t: u32) -> i32 {
        (((t & Self::CHARGE_MASK) >> Self::CHARGE_SHIFT) as u8 as i8) as i32
    }

    pub fn is_aromatic(t: u32) -> bool {
        t & Self::AROMATIC != 0
    }

    pub fn is_chain(t: u32) -> bool {
        t & Self::CHAIN != 0
    }
}

impl TypeMgr for Atoms {
    fn code(&self, name: &str) -> Option<u32> {
        name.parse::<Element>().ok().map(|e| e.number())
    }

    fn name(&self, code: u32) -> Option<String> {
        if Self::is_chain(code) {
            return Some("*".to_string());
        }
        let element = Self::element(code)?;
        let mut name = element.symbol().to_string();
        match Self::charge(code) {
            0 => (),
            1 => name.push('+'),
            -1 => name.push('-'),
            c if c > 0 => name.push_str(&format!("+{c}")),
            c => name.push_str(&format!("{c}")),
        }
        Some(name)
    }
}

/// Bond type codes.
///
/// The codes are chosen so that the masks [`Bonds::UPGRADE`],
/// [`Bonds::DOWNGRADE`] and [`Bonds::SAME_TYPE`] merge aromatic bonds with
/// double bonds, aromatic bonds with single bonds, or all bonds into one
/// type, respectively.
#[derive(Debug, Default, Copy, Clone)]
pub struct Bonds;

impl Bonds {
    pub const NULL: u32 = 0x00;
    pub const SINGLE: u32 = 0x01;
    pub const AROMATIC: u32 = 0x07;
    pub const DOUBLE: u32 = 0x0f;
    pub const TRIPLE: u32 = 0x11;

    pub const BOND_MASK: u32 = 0x1f;
    pub const SAME_TYPE: u32 = !0x1e;
    pub const DOWNGRADE: u32 = !0x06;
    pub const UPGRADE: u32 = !0x0c;

    /// Flag on an edge type marking a ring edge.
    pub const RING: u32 = 0x8000_0000;

    /// Return the bond code without the ring flag.
    pub fn bond(t: u32) -> u32 {
        t & Self::BOND_MASK
    }

    /// Return the bond symbol used by line notations.
    pub fn symbol(t: u32) -> &'static str {
        match Self::bond(t) {
            Self::NULL => ".",
            Self::SINGLE => "-",
            Self::AROMATIC => ":",
            // 0x03 is an upgraded aromatic bond, 0x09 a downgraded double
            Self::DOUBLE | 0x03 | 0x09 => "=",
            Self::TRIPLE => "#",
            _ => "?",
        }
    }
}

impl TypeMgr for Bonds {
    fn code(&self, name: &str) -> Option<u32> {
        match name {
            "." => Some(Self::NULL),
            "-" | "/" | "\\" => Some(Self::SINGLE),
            ":" => Some(Self::AROMATIC),
            "=" => Some(Self::DOUBLE),
            "#" => Some(Self::TRIPLE),
            _ => None,
        }
    }

    fn name(&self, code: u32) -> Option<String> {
        match Self::symbol(code) {
            "?" => None,
            s => Some(s.to_string()),
        }
    }
}

/// A growable registry for notations that invent their types on the fly.
#[derive(Debug, Default, Clone)]
pub struct DynamicTypes {
    codes: HashMap<String, u32>,
    names: Vec<String>,
}

impl DynamicTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl TypeMgr for DynamicTypes {
    fn add(&mut self, name: &str) -> Option<u32> {
        if let Some(&code) = self.codes.get(name) {
            return Some(code);
        }
        let code = self.names.len() as u32;
        self.codes.insert(name.to_string(), code);
        self.names.push(name.to_string());
        Some(code)
    }

    fn code(&self, name: &str) -> Option<u32> {
        self.codes.get(name).copied()
    }

    fn name(&self, code: u32) -> Option<String> {
        self.names.get(code as usize).cloned()
    }

    fn is_fixed(&self) -> bool {
        false
    }
}

/// Frequency-ordered recoding of node types.
///
/// Rare types get small codes, so seeds are processed from the rarest type
/// upwards. Types listed as `last` (excluded as seeds) are placed after all
/// others.
#[derive(Debug, Clone, Default)]
pub struct Recoder {
    codes: HashMap<u32, u32>,
    types: Vec<u32>,
}

impl Recoder {
    /// Build a recoder from `(type, frequency)` pairs.
    pub fn new(counts: impl IntoIterator<Item = (u32, usize)>, last: &[u32]) -> Self {
        let mut counts: Vec<(bool, usize, u32)> = counts
            .into_iter()
            .map(|(t, n)| (last.contains(&t), n, t))
            .collect();
        counts.sort_unstable();
        counts.dedup_by_key(|&mut (_, _, t)| t);

        let types: Vec<u32> = counts.into_iter().map(|(_, _, t)| t).collect();
        let codes = types
            .iter()
            .enumerate()
            .map(|(i, &t)| (t, i as u32))
            .collect();
        Self { codes, types }
    }

    /// Return the code of node type `t`, if it was seen.
    pub fn encode(&self, t: u32) -> Option<u32> {
        self.codes.get(&t).copied()
    }

    /// Return the node type behind `code`; the chain flag is carried over.
    pub fn decode(&self, code: u32) -> u32 {
        let flag = code & Atoms::CHAIN;
        let t = self
            .types
            .get((code & !Atoms::CHAIN) as usize)
            .copied()
            .unwrap_or(code & !Atoms::CHAIN);
        t | flag
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
