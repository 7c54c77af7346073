//! Property tests for flat index search ordering and persistence.

use std::collections::HashMap;

use pdfchat_rag::document::Chunk;
use pdfchat_rag::index::{DistanceMetric, FlatIndex, IndexEntry};
use pdfchat_rag::storage::IndexLocation;
use proptest::prelude::*;

/// Generate an arbitrary embedding of the given dimension.
fn arb_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim)
}

fn arb_metric() -> impl Strategy<Value = DistanceMetric> {
    prop_oneof![Just(DistanceMetric::L2), Just(DistanceMetric::Cosine)]
}

fn chunk(position: usize, text: String) -> Chunk {
    Chunk {
        id: format!("doc_0_{position}"),
        text,
        source: "doc.pdf".to_string(),
        page: 0,
        position,
        start_index: 0,
        metadata: HashMap::new(),
    }
}

/// Generate index entries with distinct positions.
fn arb_entries(dim: usize) -> impl Strategy<Value = Vec<IndexEntry>> {
    proptest::collection::vec(("[a-z ]{5,30}", arb_embedding(dim)), 1..20).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (text, vector))| IndexEntry::new(vector, chunk(i, text)))
            .collect()
    })
}

/// *For any* set of entries and query, search SHALL return at most
/// `min(k, len)` results ordered by non-decreasing distance, with ties in
/// insertion order.
mod prop_flat_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_and_bounded(
            entries in arb_entries(DIM),
            query in arb_embedding(DIM),
            metric in arb_metric(),
            k in 0usize..25,
        ) {
            let count = entries.len();
            let index = FlatIndex::build(entries, metric).unwrap();
            let results = index.search(&query, k).unwrap();

            prop_assert_eq!(results.len(), k.min(count));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].distance <= window[1].distance,
                    "results not in ascending order: {} > {}",
                    window[0].distance,
                    window[1].distance,
                );
                if window[0].distance == window[1].distance {
                    prop_assert!(window[0].chunk.position < window[1].chunk.position);
                }
            }
            for (rank, result) in results.iter().enumerate() {
                prop_assert_eq!(result.rank, rank);
            }
        }

        #[test]
        fn duplicate_vectors_tie_in_insertion_order(
            vector in arb_embedding(DIM),
            copies in 2usize..6,
        ) {
            let entries = (0..copies)
                .map(|i| IndexEntry::new(vector.clone(), chunk(i, format!("copy {i}"))))
                .collect();
            let index = FlatIndex::build(entries, DistanceMetric::L2).unwrap();
            let positions: Vec<usize> =
                index.search(&vector, copies).unwrap().iter().map(|r| r.chunk.position).collect();
            prop_assert_eq!(positions, (0..copies).collect::<Vec<_>>());
        }
    }
}

/// *For any* index and query, `load(save(index))` SHALL return identical
/// search results.
mod prop_save_load_round_trip {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(25))]

        #[test]
        fn reloaded_index_searches_identically(
            entries in arb_entries(DIM),
            queries in proptest::collection::vec(arb_embedding(DIM), 1..5),
            metric in arb_metric(),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let dir = tempfile::tempdir().unwrap();
            let location = IndexLocation::new(dir.path(), "vector_space");

            let index = FlatIndex::build(entries, metric).unwrap().with_embedding_model("prop");
            let loaded = rt.block_on(async {
                index.save(&location).await.unwrap();
                FlatIndex::load(&location).await.unwrap()
            });

            for query in &queries {
                prop_assert_eq!(index.search(query, 5).unwrap(), loaded.search(query, 5).unwrap());
            }
        }
    }
}
