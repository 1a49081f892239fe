#![allow(missing_docs)]

use std::sync::Arc;

use lineage::storage::features::{
    DoubleFeatureMap, FeatureUndo, IntFeatureMap, ObjFeatureMap, UndoStepId,
};
use lineage::{EdgeId, FeatureSpec, FeatureTarget, LineageError, Model, Result, VertexId};

fn declared(model: &Model) -> Result<()> {
    let features = model.features();
    features.declare(FeatureSpec::int("generation", FeatureTarget::Vertex, -1))?;
    features.declare(FeatureSpec::double("speed", FeatureTarget::Edge, f64::NAN))?;
    features.declare(FeatureSpec::object("label", FeatureTarget::Vertex).info("free text"))?;
    Ok(())
}

#[test]
fn sentinel_valued_entries_count_as_set() -> Result<()> {
    let model = Model::default();
    declared(&model)?;
    let generation: Arc<IntFeatureMap<VertexId>> = model.features().feature_map("generation")?;
    let v = model.write().add_vertex()?;

    assert!(!generation.is_set(v));
    assert_eq!(generation.get_or_no_entry(v), -1);
    generation.set(v, -1);
    assert!(generation.is_set(v));
    assert_eq!(generation.get(v), Some(-1));

    let step = model.next_undo_step();
    generation.store(step, v);
    generation.remove(v);
    generation.retrieve(step, v);
    assert_eq!(generation.get(v), Some(-1));
    Ok(())
}

#[test]
fn retrieve_restores_prior_values_or_unsets() -> Result<()> {
    let model = Model::default();
    declared(&model)?;
    let label: Arc<ObjFeatureMap<VertexId, String>> = model.features().feature_map("label")?;
    let generation: Arc<IntFeatureMap<VertexId>> = model.features().feature_map("generation")?;
    let (a, b) = {
        let mut graph = model.write();
        (graph.add_vertex()?, graph.add_vertex()?)
    };
    label.set(a, "founder".to_owned());
    generation.set(a, 0);

    // One undo step per recorded object.
    let (step_a, step_b) = (model.next_undo_step(), model.next_undo_step());
    model.features().store_all(step_a, a);
    model.features().store_all(step_b, b);
    label.set(a, "renamed".to_owned());
    generation.set(b, 4);

    model.features().retrieve_all(step_a, a);
    model.features().retrieve_all(step_b, b);
    assert_eq!(label.get(a).as_deref(), Some("founder"));
    assert_eq!(generation.get(a), Some(0));
    assert!(!generation.is_set(b));
    assert_eq!(label.undo_len() + generation.undo_len(), 0);
    Ok(())
}

#[test]
fn swap_twice_is_identity() -> Result<()> {
    let model = Model::default();
    declared(&model)?;
    let speed: Arc<DoubleFeatureMap<EdgeId>> = model.features().feature_map("speed")?;
    let e = {
        let mut graph = model.write();
        let a = graph.add_vertex()?;
        let b = graph.add_vertex()?;
        graph.add_edge(a, b)?
    };
    speed.set(e, 1.5);
    let step = UndoStepId(7);
    speed.store(step, e);
    speed.set(e, 3.0);

    model.features().swap_all(step, e);
    assert_eq!(speed.get(e), Some(1.5));
    model.features().swap_all(step, e);
    assert_eq!(speed.get(e), Some(3.0));

    // A swap against an unset snapshot unsets the live value and back.
    let empty = UndoStepId(8);
    speed.swap(empty, e);
    assert!(!speed.is_set(e));
    speed.swap(empty, e);
    assert_eq!(speed.get(e), Some(3.0));

    model.features().clear_all(step);
    assert_eq!(speed.undo_len(), 0);
    Ok(())
}

#[test]
fn declarations_are_checked() -> Result<()> {
    let model = Model::default();
    declared(&model)?;
    assert!(matches!(
        model
            .features()
            .declare(FeatureSpec::int("generation", FeatureTarget::Edge, 0)),
        Err(LineageError::DuplicateFeature(_))
    ));
    assert!(matches!(
        model.features().feature_map::<IntFeatureMap<VertexId>>("missing"),
        Err(LineageError::UnknownFeature(_))
    ));
    assert!(matches!(
        model.features().feature_map::<IntFeatureMap<EdgeId>>("generation"),
        Err(LineageError::Invalid(_))
    ));
    assert!(!model.features().is_materialized("generation"));
    Ok(())
}

#[test]
fn removed_objects_drop_values_but_keep_snapshots() -> Result<()> {
    let model = Model::default();
    declared(&model)?;
    let generation: Arc<IntFeatureMap<VertexId>> = model.features().feature_map("generation")?;
    let v = model.write().add_vertex()?;
    generation.set(v, 2);
    let step = model.next_undo_step();
    generation.store(step, v);

    model.write().remove_vertex(v)?;
    assert!(generation.is_empty());
    assert_eq!(generation.undo_len(), 1);
    Ok(())
}
