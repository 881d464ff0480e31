//! Dependency analyzer
//!
//! Builds a DAG over a plan's steps. An edge j→i (i > j) exists when
//! step i's arguments textually reference step j's result via the
//! `{{step_j.output}}` placeholder, or when both steps write the same
//! target path. Edges point strictly forward in input order, so cycles
//! are impossible by construction.

use crate::intent::Step;
use serde_json::Value;
use std::collections::HashSet;

/// Placeholder referencing an earlier step's output
pub fn output_placeholder(index: usize) -> String {
    format!("{{{{step_{}.output}}}}", index)
}

/// Explicit adjacency structure by step index
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// dependencies[i] = indices this step waits on (all < i)
    dependencies: Vec<HashSet<usize>>,
}

impl DependencyGraph {
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn dependencies_of(&self, index: usize) -> &HashSet<usize> {
        &self.dependencies[index]
    }

    /// Steps with no incoming edges — the initial ready set
    pub fn roots(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.dependencies[i].is_empty())
            .collect()
    }

    /// Topological layering: each wave's steps only depend on earlier waves
    pub fn waves(&self) -> Vec<Vec<usize>> {
        let mut level = vec![0usize; self.len()];
        for i in 0..self.len() {
            // Dependencies are strictly earlier, so one forward pass settles levels
            for &dep in &self.dependencies[i] {
                level[i] = level[i].max(level[dep] + 1);
            }
        }

        let mut waves: Vec<Vec<usize>> = Vec::new();
        for (i, &lvl) in level.iter().enumerate() {
            if waves.len() <= lvl {
                waves.resize(lvl + 1, Vec::new());
            }
            waves[lvl].push(i);
        }
        waves
    }

    /// True iff at least two steps are independent of each other
    ///
    /// Same-target writers always carry an edge, so any wave with two or
    /// more members holds only side-effect-independent steps.
    pub fn can_parallelize(&self) -> bool {
        self.waves().iter().any(|wave| wave.len() >= 2)
    }
}

/// Builds dependency graphs from step lists
pub struct DependencyAnalyzer;

impl DependencyAnalyzer {
    /// Build the DAG for an ordered step list
    pub fn build(steps: &[Step]) -> DependencyGraph {
        let write_targets: Vec<Option<String>> = steps.iter().map(write_target).collect();

        let mut dependencies = vec![HashSet::new(); steps.len()];
        for i in 0..steps.len() {
            for j in 0..i {
                if references_output(&steps[i], j) || same_write_target(&write_targets, i, j) {
                    dependencies[i].insert(j);
                }
            }
        }

        DependencyGraph { dependencies }
    }
}

/// Does any argument of `step` reference step `j`'s output?
fn references_output(step: &Step, j: usize) -> bool {
    let placeholder = output_placeholder(j);
    step.args.values().any(|v| value_contains(v, &placeholder))
}

fn value_contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.contains(needle),
        Value::Array(items) => items.iter().any(|v| value_contains(v, needle)),
        Value::Object(map) => map.values().any(|v| value_contains(v, needle)),
        _ => false,
    }
}

/// The path a mutating step writes, if any
fn write_target(step: &Step) -> Option<String> {
    if !step.is_mutating() {
        return None;
    }
    step.arg_str("destination")
        .or_else(|| step.arg_str("path"))
}

fn same_write_target(targets: &[Option<String>], i: usize, j: usize) -> bool {
    match (&targets[i], &targets[j]) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(path: &str) -> Step {
        Step::new("FileOps", "scan", 0).with_arg("path", path)
    }

    #[test]
    fn test_independent_reads_form_one_wave() {
        let steps = vec![scan("/a"), scan("/b")];
        let graph = DependencyAnalyzer::build(&steps);

        assert_eq!(graph.roots(), vec![0, 1]);
        assert_eq!(graph.waves(), vec![vec![0, 1]]);
        assert!(graph.can_parallelize());
    }

    #[test]
    fn test_placeholder_reference_creates_edge() {
        let steps = vec![
            scan("/a"),
            Step::new("TextOps", "write", 2)
                .with_arg("path", "/tmp/out.txt")
                .with_arg("content", "{{step_0.output}}"),
        ];
        let graph = DependencyAnalyzer::build(&steps);

        assert!(graph.dependencies_of(1).contains(&0));
        assert_eq!(graph.waves(), vec![vec![0], vec![1]]);
        assert!(!graph.can_parallelize());
    }

    #[test]
    fn test_nested_placeholder_reference_detected() {
        let steps = vec![
            scan("/a"),
            Step::new("FileOps", "write_file", 2)
                .with_arg("path", "/tmp/out.txt")
                .with_arg("content", serde_json::json!({"body": "see {{step_0.output}}"})),
        ];
        let graph = DependencyAnalyzer::build(&steps);
        assert!(graph.dependencies_of(1).contains(&0));
    }

    #[test]
    fn test_same_write_target_serializes_steps() {
        let steps = vec![
            Step::new("FileOps", "touch", 1).with_arg("path", "/tmp/x"),
            Step::new("TextOps", "append", 1)
                .with_arg("path", "/tmp/x")
                .with_arg("content", "hi"),
        ];
        let graph = DependencyAnalyzer::build(&steps);
        assert!(graph.dependencies_of(1).contains(&0));
        assert!(!graph.can_parallelize());
    }

    #[test]
    fn test_distinct_write_targets_stay_parallel() {
        let steps = vec![
            Step::new("FileOps", "touch", 1).with_arg("path", "/tmp/x"),
            Step::new("FileOps", "touch", 1).with_arg("path", "/tmp/y"),
        ];
        let graph = DependencyAnalyzer::build(&steps);
        assert!(graph.can_parallelize());
    }

    #[test]
    fn test_move_destination_counts_as_write_target() {
        let steps = vec![
            Step::new("FileOps", "move", 1)
                .with_arg("source", "/tmp/a/*.pdf")
                .with_arg("destination", "/tmp/dest"),
            Step::new("FileOps", "move", 1)
                .with_arg("source", "/tmp/b/*.pdf")
                .with_arg("destination", "/tmp/dest"),
        ];
        let graph = DependencyAnalyzer::build(&steps);
        assert!(graph.dependencies_of(1).contains(&0));
    }

    #[test]
    fn test_diamond_layers() {
        let steps = vec![
            scan("/a"),
            Step::new("FileOps", "write_file", 2)
                .with_arg("path", "/tmp/left")
                .with_arg("content", "{{step_0.output}}"),
            Step::new("FileOps", "write_file", 2)
                .with_arg("path", "/tmp/right")
                .with_arg("content", "{{step_0.output}}"),
            Step::new("TextOps", "append", 1)
                .with_arg("path", "/tmp/summary")
                .with_arg("content", "{{step_1.output}} {{step_2.output}}"),
        ];
        let graph = DependencyAnalyzer::build(&steps);
        assert_eq!(graph.waves(), vec![vec![0], vec![1, 2], vec![3]]);
        assert!(graph.can_parallelize());
    }

    #[test]
    fn test_empty_plan() {
        let graph = DependencyAnalyzer::build(&[]);
        assert!(graph.is_empty());
        assert!(!graph.can_parallelize());
        assert!(graph.waves().is_empty());
    }
}
