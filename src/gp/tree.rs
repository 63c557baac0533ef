//! Genetic-programming trees.
//!
//! Where a GEP chromosome stores its tree flattened into a fixed-length
//! gene, a GP genome is the tree itself: recursively owned nodes built
//! directly by depth-bounded random construction. The same symbol catalog
//! drives both representations, so GP trees share the weighted symbol
//! sampling, evaluation semantics and token codec of the linear path.

use crate::codec::{self, Token};
use crate::data::{DataSplit, TerminalData};
use crate::error::{KarvaError, Result};
use crate::functions::Op;
use crate::symbols::{SymbolKind, SymbolSet};
use rand::Rng;
use std::collections::HashMap;

/// One node of a GP tree. `Const` leaves carry an ephemeral constant drawn
/// at construction time; `Function` nodes keep their catalog id so the tree
/// serializes against the same symbol set it was built from.
#[derive(Debug, Clone, PartialEq)]
pub enum GpNode {
    Const(f64),
    Terminal { id: usize, column: usize },
    Function { id: usize, op: Op, children: Vec<GpNode> },
}

impl GpNode {
    pub fn eval(&self, data: &TerminalData, split: DataSplit, row: usize) -> f64 {
        match self {
            GpNode::Const(value) => *value,
            GpNode::Terminal { column, .. } => data.value(split, *column, row),
            GpNode::Function { op, children, .. } => {
                let args: Vec<f64> = children.iter().map(|c| c.eval(data, split, row)).collect();
                op.apply(&args)
            }
        }
    }

    pub fn size(&self) -> usize {
        match self {
            GpNode::Function { children, .. } => {
                1 + children.iter().map(GpNode::size).sum::<usize>()
            }
            _ => 1,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            GpNode::Function { children, .. } => {
                1 + children.iter().map(GpNode::depth).max().unwrap_or(0)
            }
            _ => 1,
        }
    }

    pub fn variable_usage(&self, counts: &mut [usize]) {
        match self {
            GpNode::Terminal { id, .. } => counts[*id] += 1,
            GpNode::Function { children, .. } => {
                for child in children {
                    child.variable_usage(counts);
                }
            }
            GpNode::Const(_) => {}
        }
    }

    pub fn function_usage(&self, counts: &mut HashMap<String, usize>) {
        if let GpNode::Function { op, children, .. } = self {
            *counts.entry(op.name().to_string()).or_insert(0) += 1;
            for child in children {
                child.function_usage(counts);
            }
        }
    }

    pub fn to_math_string(&self, set: &SymbolSet) -> String {
        match self {
            GpNode::Const(value) => value.to_string(),
            GpNode::Terminal { id, .. } => set.symbol(*id).name.clone(),
            GpNode::Function { op, children, .. } => {
                let args: Vec<String> = children.iter().map(|c| c.to_math_string(set)).collect();
                op.render(&args)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpTree {
    pub root: GpNode,
}

impl GpTree {
    /// Full construction: every branch reaches exactly `max_depth`.
    pub fn full<R: Rng>(set: &SymbolSet, rng: &mut R, max_depth: usize) -> Self {
        Self {
            root: build(set, rng, max_depth, true),
        }
    }

    /// Grow construction: branches may stop early, drawing
    /// function-vs-terminal by the set's composition probability.
    pub fn grow<R: Rng>(set: &SymbolSet, rng: &mut R, max_depth: usize) -> Self {
        Self {
            root: build(set, rng, max_depth, false),
        }
    }

    pub fn eval(&self, data: &TerminalData, split: DataSplit, row: usize) -> f64 {
        self.root.eval(data, split, row)
    }

    pub fn size(&self) -> usize {
        self.root.size()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn to_math_string(&self, set: &SymbolSet) -> String {
        self.root.to_math_string(set)
    }

    /// Serialize as a pre-order token stream: each node is its symbol id,
    /// constant leaves followed by their value. Structure is implicit in
    /// the arities, exactly as in Karva text genotypes.
    pub fn genotype_to_string(&self, set: &SymbolSet) -> Result<String> {
        let mut out = String::new();
        write_node(&self.root, set, &mut out)?;
        Ok(out)
    }

    /// Parse a pre-order token stream back into a tree. Returns the tree
    /// and the position after the last consumed token.
    pub fn parse_genotype(set: &SymbolSet, text: &str, position: usize) -> Result<(Self, usize)> {
        let (root, next) = read_node(set, text, position)?;
        Ok((Self { root }, next))
    }
}

fn build<R: Rng>(set: &SymbolSet, rng: &mut R, depth_left: usize, full: bool) -> GpNode {
    let choose_function = depth_left > 1
        && (full || rng.gen::<f64>() < set.probability_of_choosing_function());
    if choose_function {
        let id = set.choose_function_symbol(rng);
        let op = set.symbol(id).op().expect("function ids carry ops");
        let children = (0..op.arity())
            .map(|_| build(set, rng, depth_left - 1, full))
            .collect();
        GpNode::Function { id, op, children }
    } else {
        terminal_node(set, rng)
    }
}

fn terminal_node<R: Rng>(set: &SymbolSet, rng: &mut R) -> GpNode {
    let id = set.choose_terminal_symbol(rng);
    match &set.symbol(id).kind {
        SymbolKind::Terminal { column } => GpNode::Terminal { id, column: *column },
        SymbolKind::ConstantTerminal => {
            let pool = set.constants().expect("constant-terminal implies a pool");
            let value = if pool.integer_mode {
                let range = (pool.upper - pool.lower + 1.0) as u64;
                rng.gen_range(0..range) as f64 + pool.lower
            } else {
                pool.lower + rng.gen::<f64>() * (pool.upper - pool.lower)
            };
            GpNode::Const(value)
        }
        SymbolKind::Function { .. } => unreachable!("terminal sampling returned a function"),
    }
}

fn write_node(node: &GpNode, set: &SymbolSet, out: &mut String) -> Result<()> {
    match node {
        GpNode::Const(value) => {
            let id = set.constant_terminal().ok_or_else(|| {
                KarvaError::Genotype(
                    "tree holds a constant but the symbol set has no constant-terminal".to_string(),
                )
            })?;
            codec::encode_i32(out, id as i32);
            codec::encode_f64(out, *value);
        }
        GpNode::Terminal { id, .. } => codec::encode_i32(out, *id as i32),
        GpNode::Function { id, children, .. } => {
            codec::encode_i32(out, *id as i32);
            for child in children {
                write_node(child, set, out)?;
            }
        }
    }
    Ok(())
}

fn read_node(set: &SymbolSet, text: &str, position: usize) -> Result<(GpNode, usize)> {
    let (token, mut cursor) = codec::decode(text, position)?;
    let Token::I32(id) = token else {
        return Err(KarvaError::Genotype(format!(
            "expected a symbol id token at position {position}, found {token:?}"
        )));
    };
    let id = usize::try_from(id)
        .map_err(|_| KarvaError::Genotype(format!("negative symbol id {id}")))?;
    let symbol = set.symbol_checked(id)?;
    match &symbol.kind {
        SymbolKind::ConstantTerminal => {
            let (token, next) = codec::decode(text, cursor)?;
            let Token::F64(value) = token else {
                return Err(KarvaError::Genotype(format!(
                    "expected a constant value token at position {cursor}, found {token:?}"
                )));
            };
            Ok((GpNode::Const(value), next))
        }
        SymbolKind::Terminal { column } => Ok((GpNode::Terminal { id, column: *column }, cursor)),
        SymbolKind::Function { op } => {
            let op = *op;
            let mut children = Vec::with_capacity(op.arity());
            for _ in 0..op.arity() {
                let (child, next) = read_node(set, text, cursor)?;
                children.push(child);
                cursor = next;
            }
            Ok((GpNode::Function { id, op, children }, cursor))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConstantConfig, FunctionSpec, SymbolConfig};
    use crate::functions::FunctionRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_set(constants: bool) -> SymbolSet {
        let config = SymbolConfig {
            functions: vec![FunctionSpec::new("+"), FunctionSpec::new("*")],
            terminals: vec!["x".into(), "y".into()],
            constants: constants.then(|| ConstantConfig {
                per_gene: 4,
                lower: -1.0,
                upper: 1.0,
                integer_mode: false,
            }),
        };
        SymbolSet::build(&config, &FunctionRegistry::new()).unwrap()
    }

    #[test]
    fn test_full_reaches_max_depth() {
        let set = small_set(false);
        let mut rng = StdRng::seed_from_u64(12);
        for _ in 0..20 {
            let tree = GpTree::full(&set, &mut rng, 4);
            assert_eq!(tree.depth(), 4);
        }
    }

    #[test]
    fn test_grow_bounded_by_max_depth() {
        let set = small_set(false);
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..50 {
            let tree = GpTree::grow(&set, &mut rng, 5);
            assert!(tree.depth() <= 5);
            assert!(tree.size() >= 1);
        }
    }

    #[test]
    fn test_eval_known_tree() {
        let set = small_set(false);
        // (x + y) * x
        let tree = GpTree {
            root: GpNode::Function {
                id: 1,
                op: Op::Mul,
                children: vec![
                    GpNode::Function {
                        id: 0,
                        op: Op::Add,
                        children: vec![
                            GpNode::Terminal { id: 2, column: 0 },
                            GpNode::Terminal { id: 3, column: 1 },
                        ],
                    },
                    GpNode::Terminal { id: 2, column: 0 },
                ],
            },
        };
        let data = TerminalData::training_only(vec![vec![3.0], vec![4.0]]).unwrap();
        assert_eq!(tree.eval(&data, DataSplit::Training, 0), 21.0);
        assert_eq!(tree.size(), 5);
        assert_eq!(tree.to_math_string(&set), "((x + y) * x)");
    }

    #[test]
    fn test_serialization_roundtrip() {
        for constants in [false, true] {
            let set = small_set(constants);
            let mut rng = StdRng::seed_from_u64(44);
            for _ in 0..20 {
                let tree = GpTree::grow(&set, &mut rng, 6);
                let text = tree.genotype_to_string(&set).unwrap();
                let (back, consumed) = GpTree::parse_genotype(&set, &text, 0).unwrap();
                assert_eq!(consumed, text.len());
                assert_eq!(back, tree);
            }
        }
    }

    #[test]
    fn test_ephemeral_constants_in_range() {
        let set = small_set(true);
        let mut rng = StdRng::seed_from_u64(5);
        let mut found = 0;
        for _ in 0..100 {
            let tree = GpTree::grow(&set, &mut rng, 4);
            let mut stack = vec![&tree.root];
            while let Some(node) = stack.pop() {
                match node {
                    GpNode::Const(value) => {
                        assert!((-1.0..1.0).contains(value));
                        found += 1;
                    }
                    GpNode::Function { children, .. } => stack.extend(children.iter()),
                    GpNode::Terminal { .. } => {}
                }
            }
        }
        assert!(found > 0, "no ephemeral constants drawn in 100 trees");
    }

    #[test]
    fn test_usage_counts() {
        let set = small_set(false);
        let tree = GpTree {
            root: GpNode::Function {
                id: 0,
                op: Op::Add,
                children: vec![
                    GpNode::Terminal { id: 2, column: 0 },
                    GpNode::Terminal { id: 2, column: 0 },
                ],
            },
        };
        let mut variables = vec![0usize; set.len()];
        tree.root.variable_usage(&mut variables);
        assert_eq!(variables[2], 2);
        let mut functions = HashMap::new();
        tree.root.function_usage(&mut functions);
        assert_eq!(functions["+"], 1);
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let set = small_set(false);
        let tree = GpTree::full(&set, &mut StdRng::seed_from_u64(3), 3);
        let text = tree.genotype_to_string(&set).unwrap();
        assert!(GpTree::parse_genotype(&set, &text[..text.len() / 2], 0).is_err());
    }
}
