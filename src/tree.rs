//! Expression trees decoded from Karva-notation genes.
//!
//! Karva notation stores a tree in level order, so decoding is an
//! arity-driven breadth-first consumption of the linear gene: the root sits
//! at position 0, and each node's children are the next unread run of
//! entries. The head/tail grammar bounds consumption at the gene length.

use crate::data::{DataSplit, TerminalData};
use crate::error::{KarvaError, Result};
use crate::functions::Op;
use crate::symbols::{SymbolKind, SymbolSet};
use std::collections::HashMap;

/// One node of a decoded expression tree. Children are exclusively owned;
/// the breadth-first parse cannot produce sharing or cycles.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    /// A constant-terminal leaf with its pool value already resolved.
    Const(f64),
    /// A variable leaf: global symbol id plus its bound data column.
    Terminal { id: usize, column: usize },
    Function { op: Op, children: Vec<ExprNode> },
}

impl ExprNode {
    /// Evaluate over one data row. Function nodes evaluate every child left
    /// to right before applying their operation; arithmetic anomalies flow
    /// through as NaN/Infinity per IEEE 754 with no short-circuit inside a
    /// gene's subtree.
    pub fn eval(&self, data: &TerminalData, split: DataSplit, row: usize) -> f64 {
        match self {
            ExprNode::Const(value) => *value,
            ExprNode::Terminal { column, .. } => data.value(split, *column, row),
            ExprNode::Function { op, children } => {
                let args: Vec<f64> = children.iter().map(|c| c.eval(data, split, row)).collect();
                op.apply(&args)
            }
        }
    }

    /// Number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        match self {
            ExprNode::Function { children, .. } => {
                1 + children.iter().map(ExprNode::node_count).sum::<usize>()
            }
            _ => 1,
        }
    }

    /// Accumulate per-symbol-id usage counts for variable leaves.
    /// `counts` is indexed by global symbol id.
    pub fn variable_usage(&self, counts: &mut [usize]) {
        match self {
            ExprNode::Terminal { id, .. } => counts[*id] += 1,
            ExprNode::Function { children, .. } => {
                for child in children {
                    child.variable_usage(counts);
                }
            }
            ExprNode::Const(_) => {}
        }
    }

    /// Accumulate per-function-name usage counts.
    pub fn function_usage(&self, counts: &mut HashMap<String, usize>) {
        if let ExprNode::Function { op, children } = self {
            *counts.entry(op.name().to_string()).or_insert(0) += 1;
            for child in children {
                child.function_usage(counts);
            }
        }
    }

    /// Render as a math expression using each operation's own infix or
    /// prefix rule.
    pub fn to_math_string(&self, set: &SymbolSet) -> String {
        match self {
            ExprNode::Const(value) => value.to_string(),
            ExprNode::Terminal { id, .. } => set.symbol(*id).name.clone(),
            ExprNode::Function { op, children } => {
                let args: Vec<String> = children.iter().map(|c| c.to_math_string(set)).collect();
                op.render(&args)
            }
        }
    }
}

/// Decode one gene into an expression tree.
///
/// `dc` and `constants` are this gene's Dc slots and constant pool; Dc
/// indices are consumed strictly left-to-right as constant-terminals are
/// encountered in the breadth-first walk, which in level order is the
/// linear gene order. That correspondence is part of the genotype contract.
pub fn parse_gene(
    gene: &[usize],
    dc: Option<&[usize]>,
    constants: Option<&[f64]>,
    set: &SymbolSet,
) -> Result<ExprNode> {
    if gene.is_empty() {
        return Err(KarvaError::Generation("cannot parse an empty gene".to_string()));
    }

    // First pass: arity-driven level-order consumption. Node i's children
    // are the contiguous run starting at child_start[i].
    let mut child_start = Vec::with_capacity(gene.len());
    let mut consumed = 1usize;
    let mut index = 0usize;
    while index < consumed {
        let id = *gene.get(index).ok_or_else(|| {
            KarvaError::Generation(format!(
                "gene exhausted at position {index} with arities unfilled"
            ))
        })?;
        let symbol = set.symbol_checked(id)?;
        child_start.push(consumed);
        consumed += symbol.arity();
        index += 1;
    }

    // Second pass: resolve constant-terminal values in consumption order.
    let mut resolved: Vec<Option<f64>> = vec![None; consumed];
    let mut next_dc = 0usize;
    for (position, &id) in gene[..consumed].iter().enumerate() {
        if matches!(set.symbol(id).kind, SymbolKind::ConstantTerminal) {
            let dc = dc.ok_or_else(|| {
                KarvaError::Generation("constant-terminal in a gene without a Dc array".to_string())
            })?;
            let pool = constants.ok_or_else(|| {
                KarvaError::Generation("constant-terminal in a gene without a constant pool".to_string())
            })?;
            let slot = *dc.get(next_dc).ok_or_else(|| {
                KarvaError::Generation(format!(
                    "gene uses more constant-terminals than the {} Dc slots",
                    dc.len()
                ))
            })?;
            let value = *pool.get(slot).ok_or_else(|| {
                KarvaError::Generation(format!(
                    "Dc slot {next_dc} indexes constant {slot}, pool has {}",
                    pool.len()
                ))
            })?;
            resolved[position] = Some(value);
            next_dc += 1;
        }
    }

    Ok(build_node(gene, &child_start, &resolved, set, 0))
}

fn build_node(
    gene: &[usize],
    child_start: &[usize],
    resolved: &[Option<f64>],
    set: &SymbolSet,
    index: usize,
) -> ExprNode {
    let id = gene[index];
    match &set.symbol(id).kind {
        SymbolKind::Function { op } => {
            let start = child_start[index];
            let children = (start..start + op.arity())
                .map(|child| build_node(gene, child_start, resolved, set, child))
                .collect();
            ExprNode::Function { op: *op, children }
        }
        SymbolKind::Terminal { column } => ExprNode::Terminal { id, column: *column },
        SymbolKind::ConstantTerminal => {
            ExprNode::Const(resolved[index].expect("constants resolved in second pass"))
        }
    }
}

/// Number of linear entries the breadth-first parse of `gene` consumes.
/// Tail excess beyond the required arities stays unread.
pub fn consumed_length(gene: &[usize], set: &SymbolSet) -> Result<usize> {
    let mut consumed = 1usize;
    let mut index = 0usize;
    while index < consumed {
        let id = *gene.get(index).ok_or_else(|| {
            KarvaError::Generation(format!(
                "gene exhausted at position {index} with arities unfilled"
            ))
        })?;
        consumed += set.symbol_checked(id)?.arity();
        index += 1;
    }
    Ok(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConstantConfig, FunctionSpec, SymbolConfig};
    use crate::functions::FunctionRegistry;

    fn small_set(constants: bool) -> SymbolSet {
        let config = SymbolConfig {
            functions: vec![FunctionSpec::new("+"), FunctionSpec::new("-")],
            terminals: vec!["x".into(), "y".into()],
            constants: constants.then(ConstantConfig::default),
        };
        SymbolSet::build(&config, &FunctionRegistry::new()).unwrap()
    }

    #[test]
    fn test_simple_gene_parse() {
        // +(x, -(y, x)) from gene [+, x, -, y, x], head 3 tail 2.
        let set = small_set(false);
        let gene = [0usize, 2, 1, 3, 2];
        let tree = parse_gene(&gene, None, None, &set).unwrap();

        let expected = ExprNode::Function {
            op: Op::Add,
            children: vec![
                ExprNode::Terminal { id: 2, column: 0 },
                ExprNode::Function {
                    op: Op::Sub,
                    children: vec![
                        ExprNode::Terminal { id: 3, column: 1 },
                        ExprNode::Terminal { id: 2, column: 0 },
                    ],
                },
            ],
        };
        assert_eq!(tree, expected);

        let data = TerminalData::training_only(vec![vec![5.0], vec![2.0]]).unwrap();
        assert_eq!(tree.eval(&data, DataSplit::Training, 0), 2.0);
    }

    #[test]
    fn test_single_terminal_gene() {
        let set = small_set(false);
        let tree = parse_gene(&[3, 2, 2], None, None, &set).unwrap();
        assert_eq!(tree, ExprNode::Terminal { id: 3, column: 1 });
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_tail_excess_unconsumed() {
        let set = small_set(false);
        // Root + consumes exactly two terminals; the rest of the gene is dead.
        let gene = [0usize, 2, 3, 2, 2, 3, 3];
        assert_eq!(consumed_length(&gene, &set).unwrap(), 3);
        let tree = parse_gene(&gene, None, None, &set).unwrap();
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_constant_resolution() {
        let set = small_set(true);
        let constant = set.constant_terminal().unwrap();
        // +(C, x) with Dc [0] pointing at pool value 7.5.
        let gene = [0usize, constant, 2];
        let tree = parse_gene(&gene, Some(&[0]), Some(&[7.5]), &set).unwrap();
        let ExprNode::Function { children, .. } = &tree else {
            panic!("expected function root");
        };
        assert_eq!(children[0], ExprNode::Const(7.5));
    }

    #[test]
    fn test_dc_consumed_left_to_right() {
        let set = small_set(true);
        let constant = set.constant_terminal().unwrap();
        // +(C, -(C, C)): three constant-terminals in level order.
        let gene = [0usize, constant, 1, constant, constant];
        let pool = [10.0, 20.0, 30.0];
        let tree = parse_gene(&gene, Some(&[2, 0, 1]), Some(&pool), &set).unwrap();
        let ExprNode::Function { children, .. } = &tree else {
            panic!("expected function root");
        };
        assert_eq!(children[0], ExprNode::Const(30.0));
        let ExprNode::Function { children: inner, .. } = &children[1] else {
            panic!("expected nested function");
        };
        assert_eq!(inner[0], ExprNode::Const(10.0));
        assert_eq!(inner[1], ExprNode::Const(20.0));
    }

    #[test]
    fn test_usage_counts() {
        let set = small_set(false);
        let gene = [0usize, 2, 1, 3, 2];
        let tree = parse_gene(&gene, None, None, &set).unwrap();

        let mut variables = vec![0usize; set.len()];
        tree.variable_usage(&mut variables);
        assert_eq!(variables[2], 2);
        assert_eq!(variables[3], 1);

        let mut functions = HashMap::new();
        tree.function_usage(&mut functions);
        assert_eq!(functions["+"], 1);
        assert_eq!(functions["-"], 1);
    }

    #[test]
    fn test_math_rendering() {
        let set = small_set(false);
        let gene = [0usize, 2, 1, 3, 2];
        let tree = parse_gene(&gene, None, None, &set).unwrap();
        assert_eq!(tree.to_math_string(&set), "(x + (y - x))");
    }

    #[test]
    fn test_invalid_symbol_id_rejected() {
        let set = small_set(false);
        assert!(parse_gene(&[99, 2, 2], None, None, &set).is_err());
    }

    #[test]
    fn test_truncated_gene_rejected() {
        let set = small_set(false);
        // Root + wants two children, gene supplies one.
        assert!(parse_gene(&[0, 2], None, None, &set).is_err());
    }
}
