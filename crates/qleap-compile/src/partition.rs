//! Block partitioning: slicing a flat circuit into size-bounded
//! [`CircuitGate`] blocks, and fusing adjacent blocks back together for
//! coarser re-synthesis work units.
//!
//! Both passes are expected to run after measurements have been extracted
//! from the circuit (see the workflow's `ExtractMeasurements` bracketing) —
//! they treat every instruction uniformly by the qudits it touches and do
//! not special-case `Measure`/`Reset`/`Barrier`/`Delay`.

use std::collections::{BTreeSet, HashMap};

use qleap_ir::{Circuit, CircuitDag, CircuitGate, GateKind, Instruction, QubitId};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::pass_data::PassData;

/// Greedily grows connected subsets of operations whose combined qudit
/// support is at most `max_block_size`, then replaces each with a
/// [`CircuitGate`]. Every original operation ends up in exactly one block;
/// blocks are emitted in a topological order consistent with the original
/// dependencies; each block's body uses local qudit indices `[0..m)` with
/// the external mapping recorded as the operation's qubit list.
pub struct QuickPartitioner {
    max_block_size: u32,
}

impl QuickPartitioner {
    pub fn new(max_block_size: u32) -> Self {
        Self { max_block_size }
    }
}

/// An in-progress block: the parent qudits it currently spans, and the
/// operations assigned to it so far, still carrying their original
/// (parent-circuit) qubit indices. Remapped to local indices only when the
/// block is finally closed.
struct OpenBlock {
    qudits: BTreeSet<u32>,
    ops: Vec<Instruction>,
}

impl Pass for QuickPartitioner {
    fn name(&self) -> &str {
        "quick_partitioner"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _pass_data: &mut PassData) -> CompileResult<()> {
        let circuit = Circuit::from_dag(std::mem::take(dag));
        let partitioned = self.partition(&circuit)?;
        *dag = partitioned.into_dag();
        Ok(())
    }
}

impl QuickPartitioner {
    fn partition(&self, circuit: &Circuit) -> CompileResult<Circuit> {
        let mut out = Circuit::with_size(
            circuit.name(),
            circuit.num_qubits() as u32,
            circuit.num_clbits() as u32,
        );

        // `owner[q]` is the index into `blocks` of the open block currently
        // covering qudit `q`, if any.
        let mut owner: HashMap<u32, usize> = HashMap::new();
        let mut blocks: Vec<Option<OpenBlock>> = Vec::new();
        let mut block_counter: usize = 0;

        for (_, inst) in circuit.dag().topological_ops() {
            let qudits: Vec<u32> = inst.qubits.iter().map(|q| q.0).collect();
            if qudits.is_empty() {
                out.append(inst.clone())?;
                continue;
            }

            let mut owner_idxs: Vec<usize> =
                qudits.iter().filter_map(|q| owner.get(q).copied()).collect();
            owner_idxs.sort_unstable();
            owner_idxs.dedup();

            let mut candidate: BTreeSet<u32> = qudits.iter().copied().collect();
            for &idx in &owner_idxs {
                if let Some(block) = &blocks[idx] {
                    candidate.extend(block.qudits.iter().copied());
                }
            }

            if candidate.len() as u32 <= self.max_block_size {
                let mut merged_ops = Vec::new();
                for &idx in &owner_idxs {
                    if let Some(block) = blocks[idx].take() {
                        merged_ops.extend(block.ops);
                    }
                }
                merged_ops.push(inst.clone());

                let new_idx = blocks.len();
                for &q in &candidate {
                    owner.insert(q, new_idx);
                }
                blocks.push(Some(OpenBlock {
                    qudits: candidate,
                    ops: merged_ops,
                }));
            } else {
                // Can't fit everything together: flush every conflicting
                // block first (this instruction depends on all of them),
                // then open a fresh block for this instruction alone.
                for &idx in &owner_idxs {
                    if let Some(block) = blocks[idx].take() {
                        for q in &block.qudits {
                            owner.remove(q);
                        }
                        emit_block(&mut out, &mut block_counter, block)?;
                    }
                }

                let new_idx = blocks.len();
                let qudit_set: BTreeSet<u32> = qudits.iter().copied().collect();
                for &q in &qudit_set {
                    owner.insert(q, new_idx);
                }
                blocks.push(Some(OpenBlock {
                    qudits: qudit_set,
                    ops: vec![inst.clone()],
                }));
            }
        }

        for block in blocks.into_iter().flatten() {
            emit_block(&mut out, &mut block_counter, block)?;
        }

        Ok(out)
    }
}

/// Remap a block's operations to local indices `[0..m)` and append it to
/// `out` as a single `CircuitGate` operation over its external location.
fn emit_block(out: &mut Circuit, block_counter: &mut usize, block: OpenBlock) -> CompileResult<()> {
    let location: Vec<u32> = block.qudits.into_iter().collect();
    let mapping: HashMap<u32, u32> = location
        .iter()
        .enumerate()
        .map(|(local, &parent)| (parent, local as u32))
        .collect();

    let mut body = Circuit::with_size("block", location.len() as u32, 0);
    for mut inst in block.ops {
        inst.qubits = inst
            .qubits
            .iter()
            .map(|q| QubitId(mapping[&q.0]))
            .collect();
        body.append(inst)?;
    }

    *block_counter += 1;
    let gate = CircuitGate {
        name: format!("block_{}", *block_counter),
        body: Box::new(body),
        target: None,
    };
    let location_qubits: Vec<QubitId> = location.into_iter().map(QubitId).collect();
    out.gate(gate, location_qubits)?;
    Ok(())
}

/// Fuses adjacent `CircuitGate` blocks whose combined qudit width is at
/// most `max_block_size`, giving downstream passes bigger work units.
/// "Adjacent" means consecutive in topological order with no intervening
/// non-block operation.
pub struct ExtendBlockSizePass {
    max_block_size: u32,
}

impl ExtendBlockSizePass {
    pub fn new(max_block_size: u32) -> Self {
        Self { max_block_size }
    }
}

impl Pass for ExtendBlockSizePass {
    fn name(&self) -> &str {
        "extend_block_size"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _pass_data: &mut PassData) -> CompileResult<()> {
        let circuit = Circuit::from_dag(std::mem::take(dag));
        let fused = self.fuse(&circuit)?;
        *dag = fused.into_dag();
        Ok(())
    }
}

impl ExtendBlockSizePass {
    fn fuse(&self, circuit: &Circuit) -> CompileResult<Circuit> {
        let mut out = Circuit::with_size(
            circuit.name(),
            circuit.num_qubits() as u32,
            circuit.num_clbits() as u32,
        );

        let mut run: Vec<(CircuitGate, Vec<QubitId>)> = Vec::new();
        let mut run_qudits: BTreeSet<u32> = BTreeSet::new();
        let mut block_counter: usize = 0;

        for (_, inst) in circuit.dag().topological_ops() {
            let as_block = inst.as_gate().and_then(|gate| match &gate.kind {
                GateKind::Circuit(cg) => Some(cg.clone()),
                _ => None,
            });

            match as_block {
                Some(cg) => {
                    let qudits: BTreeSet<u32> = inst.qubits.iter().map(|q| q.0).collect();
                    let combined: BTreeSet<u32> =
                        run_qudits.union(&qudits).copied().collect();
                    if run.is_empty() || combined.len() as u32 <= self.max_block_size {
                        run_qudits = combined;
                        run.push((cg, inst.qubits.clone()));
                    } else {
                        flush_run(&mut out, &mut block_counter, &mut run, &mut run_qudits)?;
                        run_qudits = qudits;
                        run.push((cg, inst.qubits.clone()));
                    }
                }
                None => {
                    flush_run(&mut out, &mut block_counter, &mut run, &mut run_qudits)?;
                    out.append(inst.clone())?;
                }
            }
        }
        flush_run(&mut out, &mut block_counter, &mut run, &mut run_qudits)?;

        Ok(out)
    }
}

fn flush_run(
    out: &mut Circuit,
    block_counter: &mut usize,
    run: &mut Vec<(CircuitGate, Vec<QubitId>)>,
    run_qudits: &mut BTreeSet<u32>,
) -> CompileResult<()> {
    if run.is_empty() {
        return Ok(());
    }
    if run.len() == 1 {
        let (cg, location) = run.pop().unwrap();
        out.gate(cg, location)?;
        run_qudits.clear();
        return Ok(());
    }

    let location: Vec<u32> = run_qudits.iter().copied().collect();
    let mapping: HashMap<u32, u32> = location
        .iter()
        .enumerate()
        .map(|(local, &parent)| (parent, local as u32))
        .collect();

    let mut body = Circuit::with_size("block", location.len() as u32, 0);
    for (cg, block_location) in run.drain(..) {
        let remapped_location: Vec<QubitId> = block_location
            .iter()
            .map(|q| QubitId(mapping[&q.0]))
            .collect();
        body.gate(cg, remapped_location)?;
    }

    *block_counter += 1;
    let fused_gate = CircuitGate {
        name: format!("block_{}", *block_counter),
        body: Box::new(body),
        target: None,
    };
    let location_qubits: Vec<QubitId> = location.into_iter().map(QubitId).collect();
    out.gate(fused_gate, location_qubits)?;
    run_qudits.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qleap_ir::Circuit;

    #[test]
    fn test_quick_partitioner_single_block_when_width_fits() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();

        let pass = QuickPartitioner::new(2);
        let mut pass_data = PassData::new();
        pass.run(&mut dag, &mut pass_data).unwrap();

        assert_eq!(dag.num_ops(), 1);
        let (_, inst) = dag.topological_ops().next().unwrap();
        let gate = inst.as_gate().unwrap();
        match &gate.kind {
            GateKind::Circuit(cg) => assert_eq!(cg.body.dag().num_ops(), 2),
            _ => panic!("expected a circuit gate"),
        }
    }

    #[test]
    fn test_quick_partitioner_splits_when_too_wide() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        circuit.cnot(QubitId(1), QubitId(2)).unwrap();
        let mut dag = circuit.into_dag();

        // max_block_size 2 can't cover both CNOTs (they jointly span 3 qudits).
        let pass = QuickPartitioner::new(2);
        let mut pass_data = PassData::new();
        pass.run(&mut dag, &mut pass_data).unwrap();

        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn test_quick_partitioner_covers_every_op() {
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.sqrt_x(QubitId(0)).unwrap();
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        circuit.sqrt_x(QubitId(2)).unwrap();
        circuit.cnot(QubitId(2), QubitId(3)).unwrap();
        let mut dag = circuit.into_dag();

        let pass = QuickPartitioner::new(2);
        let mut pass_data = PassData::new();
        pass.run(&mut dag, &mut pass_data).unwrap();

        let total_ops: usize = dag
            .topological_ops()
            .map(|(_, inst)| match inst.as_gate().map(|g| &g.kind) {
                Some(GateKind::Circuit(cg)) => cg.body.dag().num_ops(),
                _ => 1,
            })
            .sum();
        assert_eq!(total_ops, 4);
    }

    #[test]
    fn test_extend_block_size_fuses_adjacent_blocks() {
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        circuit.cnot(QubitId(2), QubitId(3)).unwrap();
        let mut dag = circuit.into_dag();

        QuickPartitioner::new(2).run(&mut dag, &mut PassData::new()).unwrap();
        assert_eq!(dag.num_ops(), 2);

        ExtendBlockSizePass::new(4)
            .run(&mut dag, &mut PassData::new())
            .unwrap();
        assert_eq!(dag.num_ops(), 1);
    }

    #[test]
    fn test_extend_block_size_keeps_separate_when_too_wide() {
        let mut circuit = Circuit::with_size("test", 6, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        circuit.cnot(QubitId(4), QubitId(5)).unwrap();
        let mut dag = circuit.into_dag();

        QuickPartitioner::new(2).run(&mut dag, &mut PassData::new()).unwrap();
        ExtendBlockSizePass::new(3)
            .run(&mut dag, &mut PassData::new())
            .unwrap();
        assert_eq!(dag.num_ops(), 2);
    }
}
