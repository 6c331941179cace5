// Node and edge type codes, element table
pub mod types;

// Graph model and subgraph matching
pub mod graph;
mod embed;

// Code words and canonical forms
pub mod canonize;

// Occurrences of fragments and how they grow
pub mod embedding;
pub mod extension;

// Support measures
pub mod support;

// The search tree and its driver
pub mod fragment;
pub mod miner;

// Mining parameters
pub mod config;

// Notations and data IO
pub mod loader;
pub mod smiles;

pub mod error;
