#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use loopy_core::edge::EdgeConfig;
use loopy_core::engine::Engine;
use loopy_core::id::*;
use loopy_core::test_utils::*;

/// A structured operation for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    AddNode { x: i8 },
    RemoveNode { index: u8 },
    Connect { from: u8, to: u8 },
    Disconnect { index: u8 },
    Poke { index: u8, magnitude: i8 },
    SetSpeed { speed: u8 },
    Reset,
    Step { dt: u8 },
}

/// Top-level fuzz input: a sequence of operations.
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
}

fuzz_target!(|input: FuzzInput| {
    let mut engine = Engine::default();
    engine.start();
    let mut node_ids: Vec<NodeId> = Vec::new();
    let mut edge_ids: Vec<EdgeId> = Vec::new();

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(200);

    for op in &input.ops[..max_ops] {
        match *op {
            FuzzOp::AddNode { x } => {
                node_ids.push(add_node(&mut engine, quiet_node(x as f64 * 4.0)));
            }
            FuzzOp::RemoveNode { index } => {
                if !node_ids.is_empty() {
                    let node = node_ids.remove(index as usize % node_ids.len());
                    let _ = engine.remove_node(node);
                    edge_ids.retain(|&e| engine.graph.contains_edge(e));
                }
            }
            FuzzOp::Connect { from, to } => {
                if !node_ids.is_empty() {
                    let from = node_ids[from as usize % node_ids.len()];
                    let to = node_ids[to as usize % node_ids.len()];
                    if let Ok(edge) = engine.connect(from, to, EdgeConfig::default()) {
                        edge_ids.push(edge);
                    }
                }
            }
            FuzzOp::Disconnect { index } => {
                if !edge_ids.is_empty() {
                    let edge = edge_ids.remove(index as usize % edge_ids.len());
                    let _ = engine.disconnect(edge);
                }
            }
            FuzzOp::Poke { index, magnitude } => {
                if !node_ids.is_empty() {
                    let node = node_ids[index as usize % node_ids.len()];
                    engine.inject_external(node, magnitude as f64 / 64.0, None);
                }
            }
            FuzzOp::SetSpeed { speed } => engine.set_global_speed(speed as f64 / 8.0),
            FuzzOp::Reset => engine.reset(),
            FuzzOp::Step { dt } => engine.step(dt as f64 / 16.0),
        }
    }
});
