//! Line notations for molecules.
//!
//! [`Smiles`] reads and writes the SMILES notation: organic subset atoms,
//! bracket atoms with hydrogen counts and charges, explicit bonds, branches
//! and ring closure labels. Hydrogens are explicit nodes of the graph; a
//! hydrogen count in a bracket atom adds hydrogen nodes, and the writer
//! folds hydrogens bonded to a single heavy atom back into bracket counts.
//! Stereo marks (`/`, `\`) are read as single bonds, isotopes are ignored.
//! A `*` stands for a variable-length carbon chain, as written for mined
//! fragments with chain extensions.

use std::collections::HashMap;

use bit_set::BitSet;

use crate::{
    error::NotationError,
    graph::Graph,
    types::{Atoms, Bonds, Element, TypeMgr},
};

/// Converts between graphs and a line notation.
pub trait Notation {
    fn parse(&self, text: &str) -> Result<Graph, NotationError>;

    fn describe(&self, graph: &Graph) -> String;
}

#[derive(Debug, Default, Copy, Clone)]
pub struct Smiles;

impl Notation for Smiles {
    fn parse(&self, text: &str) -> Result<Graph, NotationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NotationError::Empty);
        }
        let mut parser = Parser::new(text);
        parser.run()?;
        let mut graph = parser.graph;
        graph.opt();
        Ok(graph)
    }

    fn describe(&self, graph: &Graph) -> String {
        Writer::new(graph).run()
    }
}

const MAX_ISOTOPE: u32 = 999;
const MAX_HYDROGENS: u32 = 9;
const MAX_CHARGE: u32 = 15;

const ORGANIC: [&str; 10] = ["B", "C", "N", "O", "P", "S", "F", "Cl", "Br", "I"];
const AROMATIC: [&str; 8] = ["b", "c", "n", "o", "p", "s", "se", "as"];

struct Parser {
    chars: Vec<char>,
    pos: usize,
    graph: Graph,
    prev: Option<usize>,
    bond: Option<u32>,
    branches: Vec<Option<usize>>,
    // open ring labels: node and the bond given at the opening
    labels: HashMap<usize, (usize, Option<u32>)>,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            graph: Graph::new(),
            prev: None,
            bond: None,
            branches: Vec::new(),
            labels: HashMap::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn unexpected(&self) -> NotationError {
        match self.peek() {
            Some(ch) => NotationError::UnexpectedChar { pos: self.pos, ch },
            None => NotationError::UnexpectedEnd,
        }
    }

    fn run(&mut self) -> Result<(), NotationError> {
        while let Some(c) = self.peek() {
            match c {
                '(' => {
                    if self.prev.is_none() || self.bond.is_some() {
                        return Err(self.unexpected());
                    }
                    if self.chars.get(self.pos + 1) == Some(&')') {
                        return Err(NotationError::UnexpectedParen { pos: self.pos + 1 });
                    }
                    self.branches.push(self.prev);
                    self.pos += 1;
                }
                ')' => {
                    if self.bond.is_some() {
                        return Err(self.unexpected());
                    }
                    let Some(prev) = self.branches.pop() else {
                        return Err(NotationError::SuperfluousParen { pos: self.pos });
                    };
                    self.prev = prev;
                    self.pos += 1;
                }
                '.' => {
                    if self.bond.is_some() {
                        return Err(self.unexpected());
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                '-' | '=' | '#' | ':' | '/' | '\\' => {
                    if self.bond.is_some() || self.prev.is_none() {
                        return Err(self.unexpected());
                    }
                    self.bond = Bonds.code(&c.to_string());
                    self.pos += 1;
                }
                '%' | '0'..='9' => self.ring_label()?,
                '*' => {
                    let node = self.graph.add_node(Atoms::CHAIN | Atoms::CARBON);
                    self.pos += 1;
                    self.attach(node)?;
                }
                '[' => {
                    let node = self.bracket_atom()?;
                    self.attach(node)?;
                }
                _ => {
                    let ty = self.organic_atom()?;
                    let node = self.graph.add_node(ty);
                    self.attach(node)?;
                }
            }
        }
        if self.bond.is_some() {
            return Err(NotationError::UnexpectedEnd);
        }
        if !self.branches.is_empty() {
            return Err(NotationError::MissingParen);
        }
        if let Some(&label) = self.labels.keys().min() {
            return Err(NotationError::UnclosedLabel { label });
        }
        Ok(())
    }

    fn default_bond(&self, a: usize, b: usize) -> u32 {
        if Atoms::is_aromatic(self.graph.node_type(a)) && Atoms::is_aromatic(self.graph.node_type(b)) {
            Bonds::AROMATIC
        } else {
            Bonds::SINGLE
        }
    }

    fn attach(&mut self, node: usize) -> Result<(), NotationError> {
        if let Some(prev) = self.prev {
            let bond = self.bond.take().unwrap_or_else(|| self.default_bond(prev, node));
            self.graph.add_edge(prev, node, bond)?;
        }
        self.prev = Some(node);
        Ok(())
    }

    fn ring_label(&mut self) -> Result<(), NotationError> {
        let start = self.pos;
        let Some(prev) = self.prev else {
            return Err(self.unexpected());
        };
        let label = if self.peek() == Some('%') {
            self.pos += 1;
            let mut label = 0;
            for _ in 0..2 {
                match self.peek().and_then(|c| c.to_digit(10)) {
                    Some(d) => label = label * 10 + d as usize,
                    None => return Err(self.unexpected()),
                }
                self.pos += 1;
            }
            label
        } else {
            let d = self.peek().and_then(|c| c.to_digit(10)).unwrap_or(0);
            self.pos += 1;
            d as usize
        };
        let bond = self.bond.take();
        match self.labels.remove(&label) {
            None => {
                self.labels.insert(label, (prev, bond));
            }
            Some((node, opening)) => {
                if node == prev {
                    return Err(NotationError::InvalidLabel { pos: start, label });
                }
                let bond = match (opening, bond) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(NotationError::InvalidLabel { pos: start, label })
                    }
                    (Some(a), _) | (None, Some(a)) => a,
                    (None, None) => self.default_bond(node, prev),
                };
                if self.graph.edge_between(node, prev).is_some() {
                    return Err(NotationError::InvalidLabel { pos: start, label });
                }
                self.graph.add_edge(node, prev, bond)?;
            }
        }
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<u32, NotationError> {
        let start = self.pos;
        let one: String = self.chars[start..start + 1].iter().collect();
        let two: String = self.chars[start..(start + 2).min(self.chars.len())]
            .iter()
            .collect();
        let (name, aromatic) = if two.len() == 2 && ORGANIC.contains(&two.as_str()) {
            (two, false)
        } else if ORGANIC.contains(&one.as_str()) {
            (one, false)
        } else if AROMATIC[..6].contains(&one.as_str()) {
            (one.to_uppercase(), true)
        } else if one.chars().all(char::is_alphabetic) {
            return Err(NotationError::UnknownElement { pos: start, name: one });
        } else {
            return Err(self.unexpected());
        };
        self.pos += if aromatic { 1 } else { name.chars().count() };
        let element: Element = name
            .parse()
            .map_err(|_| NotationError::UnknownElement { pos: start, name: name.clone() })?;
        Ok(Atoms::encode(element, aromatic, 0))
    }

    fn number(&mut self, what: &'static str, max: u32) -> Result<Option<u32>, NotationError> {
        let start = self.pos;
        let mut n: Option<u32> = None;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            let next = n
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|v| v.checked_add(d))
                .filter(|&v| v <= max);
            let Some(next) = next else {
                return Err(NotationError::OutOfRange { pos: start, what, max });
            };
            n = Some(next);
            self.pos += 1;
        }
        Ok(n)
    }

    fn bracket_atom(&mut self) -> Result<usize, NotationError> {
        let start = self.pos;
        self.pos += 1;
        self.number("isotope", MAX_ISOTOPE)?;

        // Element symbol, possibly aromatic.
        let sym_start = self.pos;
        let Some(first) = self.peek() else {
            return Err(NotationError::MissingBracket { pos: start });
        };
        if !first.is_alphabetic() {
            return Err(self.unexpected());
        }
        let aromatic = first.is_lowercase();
        let second = self.chars.get(self.pos + 1).copied().filter(|c| c.is_lowercase());
        let mut symbol = None;
        if let Some(second) = second {
            let two: String = [first, second].iter().collect();
            let name = capitalize(&two);
            let fits = if aromatic {
                AROMATIC.contains(&two.as_str())
            } else {
                name.parse::<Element>().is_ok()
            };
            if fits {
                symbol = Some(name);
                self.pos += 2;
            }
        }
        let symbol = match symbol {
            Some(s) => s,
            None => {
                self.pos += 1;
                capitalize(&first.to_string())
            }
        };
        let element: Element = symbol.parse().map_err(|_| NotationError::UnknownElement {
            pos: sym_start,
            name: self.chars[sym_start..self.pos].iter().collect(),
        })?;

        // Hydrogen count.
        let mut hydrogens = 0;
        if self.peek() == Some('H') {
            self.pos += 1;
            hydrogens = self.number("hydrogen count", MAX_HYDROGENS)?.unwrap_or(1);
        }

        // Charge.
        let mut charge: i32 = 0;
        if let Some(sign @ ('+' | '-')) = self.peek() {
            let charge_start = self.pos;
            let unit = if sign == '+' { 1 } else { -1 };
            self.pos += 1;
            charge = unit;
            match self.number("charge", MAX_CHARGE)? {
                Some(n) => charge = unit * n as i32,
                None => {
                    while self.peek() == Some(sign) {
                        charge += unit;
                        self.pos += 1;
                    }
                    if charge.unsigned_abs() > MAX_CHARGE {
                        return Err(NotationError::OutOfRange {
                            pos: charge_start,
                            what: "charge",
                            max: MAX_CHARGE,
                        });
                    }
                }
            }
        }

        // Atom class.
        if self.peek() == Some(':') {
            self.pos += 1;
            self.number("atom class", u32::MAX)?;
        }
        match self.peek() {
            Some(']') => self.pos += 1,
            Some(_) | None => return Err(NotationError::MissingBracket { pos: start }),
        }

        let node = self.graph.add_node(Atoms::encode(element, aromatic, charge));
        for _ in 0..hydrogens {
            let h = self.graph.add_node(Atoms::HYDROGEN);
            self.graph.add_edge(node, h, Bonds::SINGLE)?;
        }
        Ok(node)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

struct Writer<'a> {
    graph: &'a Graph,
    // hydrogens written as counts of their neighbour
    folded: BitSet,
    hydrogens: Vec<usize>,
    visited: BitSet,
    used: BitSet,
    children: Vec<Vec<usize>>,
    opens: Vec<Vec<usize>>,
    closes: Vec<Vec<usize>>,
    labels: HashMap<usize, usize>,
    free: Vec<bool>,
    out: String,
}

impl<'a> Writer<'a> {
    fn new(graph: &'a Graph) -> Self {
        let n = graph.node_count();
        let mut folded = BitSet::new();
        let mut hydrogens = vec![0; n];
        for h in 0..n {
            let node = graph.node(h);
            if node.ty() != Atoms::HYDROGEN || node.degree() != 1 {
                continue;
            }
            let e = node.edges()[0];
            let heavy = graph.edge(e).other(h);
            let t = graph.node_type(heavy);
            if Bonds::bond(graph.edge_type(e)) == Bonds::SINGLE
                && !Atoms::is_chain(t)
                && t & Atoms::ELEMENT_MASK != Atoms::HYDROGEN
            {
                folded.insert(h);
                hydrogens[heavy] += 1;
            }
        }
        Self {
            graph,
            folded,
            hydrogens,
            visited: BitSet::new(),
            used: BitSet::new(),
            children: vec![Vec::new(); n],
            opens: vec![Vec::new(); n],
            closes: vec![Vec::new(); n],
            labels: HashMap::new(),
            free: Vec::new(),
            out: String::new(),
        }
    }

    fn run(mut self) -> String {
        let mut first = true;
        for root in 0..self.graph.node_count() {
            if self.folded.contains(root) || self.visited.contains(root) {
                continue;
            }
            self.explore(root);
            if !first {
                self.out.push('.');
            }
            first = false;
            self.write(root);
        }
        self.out
    }

    // Split the edges of a component into tree edges and ring closures.
    fn explore(&mut self, n: usize) {
        self.visited.insert(n);
        for &e in self.graph.node(n).edges() {
            let m = self.graph.edge(e).other(n);
            if self.used.contains(e) || self.folded.contains(m) {
                continue;
            }
            self.used.insert(e);
            if self.visited.contains(m) {
                self.opens[m].push(e);
                self.closes[n].push(e);
            } else {
                self.children[n].push(e);
                self.explore(m);
            }
        }
    }

    fn write(&mut self, n: usize) {
        let atom = self.atom(n);
        self.out.push_str(&atom);
        for e in self.closes[n].clone() {
            if let Some(label) = self.labels.remove(&e) {
                self.free[label - 1] = true;
                self.push_label(label);
            }
        }
        for e in self.opens[n].clone() {
            let label = match self.free.iter().position(|&f| f) {
                Some(i) => i + 1,
                None => {
                    self.free.push(true);
                    self.free.len()
                }
            };
            self.free[label - 1] = false;
            self.labels.insert(e, label);
            let m = self.graph.edge(e).other(n);
            let bond = self.bond(e, n, m);
            self.out.push_str(bond);
            self.push_label(label);
        }
        let children = self.children[n].clone();
        for (i, &e) in children.iter().enumerate() {
            let m = self.graph.edge(e).other(n);
            let last = i + 1 == children.len();
            if !last {
                self.out.push('(');
            }
            let bond = self.bond(e, n, m);
            self.out.push_str(bond);
            self.write(m);
            if !last {
                self.out.push(')');
            }
        }
    }

    fn push_label(&mut self, label: usize) {
        if label < 10 {
            self.out.push_str(&label.to_string());
        } else {
            self.out.push_str(&format!("%{label:02}"));
        }
    }

    fn bond(&self, e: usize, a: usize, b: usize) -> &'static str {
        let aromatic = Atoms::is_aromatic(self.graph.node_type(a))
            && Atoms::is_aromatic(self.graph.node_type(b));
        match Bonds::bond(self.graph.edge_type(e)) {
            Bonds::SINGLE if aromatic => "-",
            Bonds::SINGLE => "",
            Bonds::AROMATIC if aromatic => "",
            t => Bonds::symbol(t),
        }
    }

    fn atom(&self, n: usize) -> String {
        let t = self.graph.node_type(n);
        if Atoms::is_chain(t) {
            return "*".to_string();
        }
        let Some(element) = Atoms::element(t) else {
            return format!("[#{}]", t & Atoms::ELEMENT_MASK);
        };
        let aromatic = Atoms::is_aromatic(t);
        let mut symbol = element.symbol().to_string();
        if aromatic {
            let lower = symbol.to_lowercase();
            if AROMATIC.contains(&lower.as_str()) {
                symbol = lower;
            }
        }
        let charge = Atoms::charge(t);
        let h = self.hydrogens[n];
        let organic = ORGANIC.contains(&element.symbol())
            && (!aromatic || AROMATIC[..6].contains(&symbol.as_str()));
        if organic && charge == 0 && h == 0 {
            return symbol;
        }
        let mut out = format!("[{symbol}");
        match h {
            0 => (),
            1 => out.push('H'),
            h => out.push_str(&format!("H{h}")),
        }
        match charge {
            0 => (),
            1 => out.push('+'),
            -1 => out.push('-'),
            c if c > 0 => out.push_str(&format!("+{c}")),
            c => out.push_str(&format!("{c}")),
        }
        out.push(']');
        out
    }
}
