//! Workflow assembly (§4.12): the optimization-level pipelines.
//!
//! Every pipeline shares one skeleton:
//!
//! ```text
//! ExtractMeasurements
//!   SetModel
//!   ResolvePendingBlocks
//!   (opt3: pre-delete loop)
//!   Mapping
//!   Retarget-MQ
//!   Retarget-SQ
//!   (opt>=2: delete loop)
//!   (opt3: resynth loop)
//!   LogError
//!   ApplyPlacement
//! RestoreMeasurements
//! ```
//!
//! `ResolvePendingBlocks` is not one of §4.12's named stages; it resolves
//! blocks built from an arbitrary target unitary (e.g. `Circuit::from_unitary`)
//! before anything downstream assumes every operation is a named gate.
//! `Retarget-MQ`/`Retarget-SQ` only rewrite gates that are already one of the
//! closed-catalog `StandardGate`s, so a pending block has to be resolved to
//! one of those first — this is the only stage that runs unconditionally at
//! every optimization level, since §6's success criterion binds regardless
//! of optimization level.
//!
//! Level 4 is a deliberate unimplemented stub (§9 / Open Questions).

use qleap_ir::{Circuit, CircuitDag, Gate, GateKind, Instruction, InstructionKind, StandardGate, UnitaryMatrix};

use crate::error::{CompileError, CompileResult};
use crate::layer::{SingleQuditLayerGenerator, WideLayerGenerator};
use crate::machine::{BasisGates, CouplingMap, Model};
use crate::partition::QuickPartitioner;
use crate::pass::{ForEachBlock, Pass, PassGroup, PassKind, WhileLoop};
use crate::pass_data::PassData;
use crate::passes::{
    ApplyPlacement, ExtractMeasurements, GeneralizedSabreLayoutPass, GeneralizedSabreRoutingPass,
    GreedyPlacementPass, LogErrorPass, Rebase2QuditGatePass, RestoreMeasurements, SetModelPass,
    U3Decomposition, UnfoldPass, ZXZXZDecomposition,
};
use crate::predicates::gate_count_predicate;
use crate::replace_filter;
use crate::runtime::ThreadRuntime;
use crate::search::qsearch::QSearch;

/// The two-qudit `StandardGate`s native to `basis`, in preference order
/// (`cnot` before `swap`). The closed catalog has exactly these two.
fn native_two_qudit_gates(basis: &BasisGates) -> Vec<StandardGate> {
    let mut gates = vec![];
    if basis.contains("cnot") {
        gates.push(StandardGate::Cnot);
    }
    if basis.contains("swap") {
        gates.push(StandardGate::Swap);
    }
    gates
}

fn native_mq_gate_names(basis: &BasisGates) -> Vec<String> {
    native_two_qudit_gates(basis)
        .iter()
        .map(|g| g.name().to_string())
        .collect()
}

/// Run a QSearch synthesis of `target` using whatever layer generator fits
/// its width, seeded from `pass_data`. Shared by [`ResolvePendingBlocks`]
/// and [`ResynthesizeBlock`] — both need "synthesize this unitary against
/// the model's native gates", they differ only in where the target unitary
/// comes from.
fn synthesize_against(
    target: &UnitaryMatrix,
    pass_data: &PassData,
    max_layer: u32,
    success_threshold: f64,
) -> CompileResult<Circuit> {
    if target.num_qudits() == 1 {
        let mut search = QSearch::new(SingleQuditLayerGenerator)
            .with_success_threshold(success_threshold)
            .with_max_layer(max_layer);
        search.instantiator = search.instantiator.clone().with_seed(pass_data.seed);
        return Ok(search.synthesize(target, pass_data, &ThreadRuntime));
    }

    let basis = pass_data.basis_gates.clone().unwrap_or_else(BasisGates::cnot_u3);
    let mq_gates = native_two_qudit_gates(&basis);
    if mq_gates.is_empty() {
        return Err(CompileError::MissingBasisGates);
    }
    let mut search = QSearch::new(WideLayerGenerator::new(mq_gates))
        .with_success_threshold(success_threshold)
        .with_max_layer(max_layer);
    search.instantiator = search.instantiator.clone().with_seed(pass_data.seed);
    Ok(search.synthesize(target, pass_data, &ThreadRuntime))
}

/// Resolves every `CircuitGate` block still carrying a pending target
/// unitary (built via `Circuit::from_unitary`, never yet synthesized) into
/// an equivalent body of native gates. Rejects a pending block wider than
/// `max_synthesis_size` per §6's value-error case (c).
struct ResolvePendingBlocks {
    max_synthesis_size: u32,
    max_layer: u32,
    success_threshold: f64,
}

impl Pass for ResolvePendingBlocks {
    fn name(&self) -> &str {
        "resolve_pending_blocks"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        let pending: Vec<_> = dag
            .topological_ops()
            .filter_map(|(idx, inst)| match &inst.kind {
                InstructionKind::Gate(Gate {
                    kind: GateKind::Circuit(block),
                    ..
                }) if block.is_pending() => Some((idx, block.clone(), inst.qubits.clone())),
                _ => None,
            })
            .collect();

        for (idx, block, location) in pending {
            if block.num_qubits() > self.max_synthesis_size {
                return Err(CompileError::CircuitTooLarge {
                    required: block.num_qubits(),
                    available: self.max_synthesis_size,
                });
            }
            let target = block.target.as_ref().expect("filtered to pending blocks");
            let synthesized = synthesize_against(target, pass_data, self.max_layer, self.success_threshold)?;
            let replacement: Vec<Instruction> = synthesized
                .dag()
                .topological_ops()
                .map(|(_, inst)| Instruction {
                    kind: inst.kind.clone(),
                    qubits: inst.qubits.iter().map(|q| location[q.0 as usize]).collect(),
                    clbits: inst.clbits.clone(),
                })
                .collect();
            dag.substitute_node(idx, replacement)?;
        }
        Ok(())
    }
}

/// Re-synthesizes an extracted block against its own unitary. Plugged into
/// [`ForEachBlock`] as the delete/resynth loops' inner pass; the
/// surrounding `replace_filter` decides whether the result is actually an
/// improvement over the block it came from.
struct ResynthesizeBlock {
    max_layer: u32,
    success_threshold: f64,
}

impl Pass for ResynthesizeBlock {
    fn name(&self) -> &str {
        "resynthesize_block"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        if dag.num_ops() == 0 {
            return Ok(());
        }
        let target = Circuit::from_dag(dag.clone()).get_unitary();
        let synthesized = synthesize_against(&target, pass_data, self.max_layer, self.success_threshold)?;
        *dag = synthesized.into_dag();
        Ok(())
    }
}

/// `GreedyPlacementPass -> GeneralizedSabreLayoutPass -> GeneralizedSabreRoutingPass` (§4.9).
fn mapping_stage() -> Box<dyn Pass> {
    Box::new(PassGroup::new(vec![
        Box::new(GreedyPlacementPass),
        Box::new(GeneralizedSabreLayoutPass::default()),
        Box::new(GeneralizedSabreRoutingPass::default()),
    ]))
}

/// Retargets whichever two-qudit `StandardGate` isn't native onto the one
/// that is (§4.10). A no-op for any gate already matching `to`.
fn retarget_mq_stage(basis: &BasisGates, max_depth: u32, max_retries: usize) -> Box<dyn Pass> {
    let native = if basis.contains("cnot") {
        StandardGate::Cnot
    } else {
        StandardGate::Swap
    };
    let other = if native.name() == "cnot" {
        StandardGate::Swap
    } else {
        StandardGate::Cnot
    };
    Box::new(PassGroup::new(vec![Box::new(Rebase2QuditGatePass::new(
        other, native, max_depth, max_retries,
    ))]))
}

/// `U3Decomposition` when the native single-qudit set is exactly `{U3}`,
/// `ZXZXZDecomposition` when it's exactly `{RZ, SqrtX}`, otherwise
/// `U3Decomposition` — its QSearch fallback branch still converges for any
/// other native set (§4.10).
fn retarget_sq_stage(basis: &BasisGates) -> Box<dyn Pass> {
    if basis.gates().len() == 2 && basis.contains("rz") && basis.contains("sqrt_x") {
        Box::new(ZXZXZDecomposition::new())
    } else {
        Box::new(U3Decomposition::new())
    }
}

/// `WhileLoop(gate_count_predicate, PassGroup([QuickPartitioner,
/// ForEachBlock(ResynthesizeBlock, replace_filter=standard), UnfoldPass]))`
/// (§4.12's "pre-delete"/"delete"/"resynth" loops): all three share this
/// shape, differing only in the block-size/search-depth budget handed to
/// the inner resynthesis attempt.
fn optimize_loop(
    basis: BasisGates,
    coupling_map: CouplingMap,
    max_block_size: u32,
    max_layer: u32,
    success_threshold: f64,
) -> Box<dyn Pass> {
    let predicate_names = native_mq_gate_names(&basis);
    let inner = ForEachBlock::new(Box::new(ResynthesizeBlock {
        max_layer,
        success_threshold,
    }))
    .with_replace_filter(replace_filter::standard(basis.clone(), coupling_map))
    .with_error_bound(true);

    let body = PassGroup::new(vec![
        Box::new(QuickPartitioner::new(max_block_size)),
        Box::new(inner),
        Box::new(UnfoldPass),
    ]);

    Box::new(WhileLoop::new(gate_count_predicate(predicate_names), Box::new(body)).with_max_iterations(64))
}

/// Builds the full pipeline for `optimization_level` (1-3) targeting
/// `model`. `max_synthesis_size` bounds both partitioning block width and
/// the widest pending block [`ResolvePendingBlocks`] will accept;
/// `synthesis_epsilon` is the success threshold every search in the
/// pipeline is held to.
pub fn build(
    optimization_level: u8,
    model: &Model,
    max_synthesis_size: u32,
    synthesis_epsilon: f64,
) -> CompileResult<PassGroup> {
    if !(1..=3).contains(&optimization_level) {
        return Err(CompileError::UnsupportedOptimizationLevel(optimization_level));
    }

    let basis = model.gate_set.clone();
    let coupling_map = model.coupling_map.clone();
    let max_layer = 4 * max_synthesis_size;

    let mut stages: Vec<Box<dyn Pass>> = vec![
        Box::new(ExtractMeasurements),
        Box::new(SetModelPass::new(model.clone())),
        Box::new(ResolvePendingBlocks {
            max_synthesis_size,
            max_layer,
            success_threshold: synthesis_epsilon,
        }),
    ];

    if optimization_level == 3 {
        stages.push(optimize_loop(
            basis.clone(),
            coupling_map.clone(),
            max_synthesis_size,
            max_layer,
            synthesis_epsilon,
        ));
    }

    stages.push(mapping_stage());
    stages.push(retarget_mq_stage(&basis, max_layer, 4));
    stages.push(retarget_sq_stage(&basis));

    if optimization_level >= 2 {
        stages.push(optimize_loop(
            basis.clone(),
            coupling_map.clone(),
            max_synthesis_size,
            max_layer,
            synthesis_epsilon,
        ));
    }

    if optimization_level == 3 {
        stages.push(optimize_loop(
            basis.clone(),
            coupling_map.clone(),
            2 * max_synthesis_size,
            2 * max_layer,
            synthesis_epsilon,
        ));
    }

    stages.push(Box::new(LogErrorPass));
    stages.push(Box::new(ApplyPlacement));
    stages.push(Box::new(RestoreMeasurements));

    Ok(PassGroup::new(stages))
}
