use conduit_engine::flatten;
use conduit_engine::SchemaMapper;
use conduit_model::{ExternalId, InterchangeGraph, JsonImporter};
use conduit_test_utils::fixtures::{self, FRAME_JSON};
use conduit_test_utils::TableMapper;
use pretty_assertions::assert_eq;

fn walk(graph: &InterchangeGraph) -> Vec<String> {
    let root = graph.root().unwrap();
    flatten(graph, root, |node| TableMapper.can_convert_to_native(node))
        .into_result()
        .unwrap()
        .into_iter()
        .filter_map(|id| graph.node(id)?.external_id().map(ExternalId::to_string))
        .collect()
}

#[test]
fn test_json_frame_matches_built_frame() {
    let imported = JsonImporter::default().import_str(FRAME_JSON).unwrap();
    assert_eq!(walk(&imported), walk(&fixtures::frame()));
    assert_eq!(walk(&imported), vec!["a1", "b1", "m1"]);
}

#[test]
fn test_chain_shape() {
    let graph = fixtures::chain(4);
    assert_eq!(walk(&graph), vec!["n0", "n1", "n2", "n3", "e0", "e1", "e2"]);
}
