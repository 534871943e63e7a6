use htree::{
    combine, evaluate, mix, partition, ByteSource, HashValue, HtreeError, MemoryBackend,
    NoopObserver, Strategy, TreeObserver, TreeOptions,
};
use std::collections::BTreeSet;
use std::sync::Mutex;

const STRATEGIES: [Strategy; 2] = [Strategy::Pool, Strategy::Spawn];

fn options(strategy: Strategy) -> TreeOptions {
    TreeOptions {
        strategy,
        workers: 4,
    }
}

fn run(data: &[u8], partitions: usize, strategy: Strategy) -> Result<HashValue, HtreeError> {
    let source = MemoryBackend::new(data.to_vec());
    evaluate(&source, partitions, &options(strategy), &NoopObserver)
}

/// Pseudo-random but reproducible content.
fn sample(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x9e37_79b9;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Single-threaded evaluation of the same tree, children before parents.
fn reference(data: &[u8], partitions: usize) -> HashValue {
    let windows = partition(data.len() as u64, partitions).unwrap();
    let mut results = vec![0; partitions];
    for i in (0..partitions).rev() {
        let w = windows[i];
        let own = mix(&data[w.offset as usize..w.end() as usize]);
        let children: Vec<HashValue> = [2 * i + 1, 2 * i + 2]
            .into_iter()
            .filter(|&c| c < partitions)
            .map(|c| results[c])
            .collect();
        results[i] = if children.is_empty() {
            own
        } else {
            combine(own, &children)
        };
    }
    results[0]
}

#[derive(Default)]
struct Recorder {
    spawned: Mutex<Vec<(usize, usize)>>,
    joined: Mutex<Vec<(usize, usize)>>,
    hashed: Mutex<Vec<usize>>,
    completed: Mutex<Vec<usize>>,
}

impl TreeObserver for Recorder {
    fn child_spawned(&self, parent: usize, child: usize) {
        self.spawned.lock().unwrap().push((parent, child));
    }

    fn region_hashed(&self, index: usize, _hash: HashValue) {
        self.hashed.lock().unwrap().push(index);
    }

    fn child_joined(&self, parent: usize, child: usize) {
        self.joined.lock().unwrap().push((parent, child));
    }

    fn node_completed(&self, index: usize, _hash: HashValue) {
        self.completed.lock().unwrap().push(index);
    }
}

#[test]
fn test_matches_reference_for_many_shapes() {
    let data = sample(4099);
    for partitions in [1, 2, 3, 4, 5, 7, 8, 15, 16, 31, 100] {
        let expected = reference(&data, partitions);
        for strategy in STRATEGIES {
            assert_eq!(
                run(&data, partitions, strategy).unwrap(),
                expected,
                "{partitions} partitions with {strategy}"
            );
        }
    }
}

#[test]
fn test_deterministic_across_runs() {
    let data = sample(2048);
    for strategy in STRATEGIES {
        let first = run(&data, 13, strategy).unwrap();
        for _ in 0..10 {
            assert_eq!(run(&data, 13, strategy).unwrap(), first);
        }
    }
}

#[test]
fn test_worker_count_does_not_change_result() {
    let data = sample(1 << 14);
    let expected = reference(&data, 64);
    for workers in [1, 2, 3, 8, 64, 1000] {
        let source = MemoryBackend::new(data.clone());
        let opts = TreeOptions {
            strategy: Strategy::Pool,
            workers,
        };
        assert_eq!(evaluate(&source, 64, &opts, &NoopObserver).unwrap(), expected);
    }
}

#[test]
fn test_single_partition_is_plain_mix() {
    let data = sample(777);
    for strategy in STRATEGIES {
        assert_eq!(run(&data, 1, strategy).unwrap(), mix(&data));
    }
}

#[test]
fn test_all_zero_file_hashes_to_zero() {
    for strategy in STRATEGIES {
        assert_eq!(run(&[0u8; 16], 1, strategy).unwrap(), 0);
    }
}

#[test]
fn test_trailing_bytes_are_ignored() {
    let ten = sample(10);
    for strategy in STRATEGIES {
        let full = run(&ten, 3, strategy).unwrap();
        let nine = run(&ten[..9], 3, strategy).unwrap();
        assert_eq!(full, nine);

        let mut tail_changed = ten.clone();
        tail_changed[9] ^= 0xff;
        assert_eq!(run(&tail_changed, 3, strategy).unwrap(), full);
    }
}

#[test]
fn test_single_bit_flips_change_checksum() {
    let data = sample(64);
    for strategy in STRATEGIES {
        let original = run(&data, 4, strategy).unwrap();
        let mut changed = 0;
        let mut total = 0;
        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut mutated = data.clone();
                mutated[byte] ^= 1 << bit;
                total += 1;
                if run(&mutated, 4, strategy).unwrap() != original {
                    changed += 1;
                }
            }
        }
        assert!(
            changed * 100 >= total * 99,
            "only {changed}/{total} flips changed the checksum"
        );
    }
}

#[test]
fn test_swapping_child_regions_changes_checksum() {
    // Regions 1 and 2 are the children of the root; exchanging their
    // content must be visible in the result.
    let data = sample(30);
    let mut swapped = data.clone();
    swapped[10..20].copy_from_slice(&data[20..30]);
    swapped[20..30].copy_from_slice(&data[10..20]);
    for strategy in STRATEGIES {
        assert_ne!(
            run(&data, 3, strategy).unwrap(),
            run(&swapped, 3, strategy).unwrap()
        );
    }
}

#[test]
fn test_fan_out_shape_for_four_nodes() {
    let data = sample(64);
    let expected: BTreeSet<(usize, usize)> = [(0, 1), (0, 2), (1, 3)].into_iter().collect();

    let recorder = Recorder::default();
    let source = MemoryBackend::new(data.clone());
    evaluate(&source, 4, &options(Strategy::Spawn), &recorder).unwrap();
    let spawned = recorder.spawned.lock().unwrap().clone();
    assert_eq!(spawned.len(), 3);
    assert_eq!(spawned.into_iter().collect::<BTreeSet<_>>(), expected);

    for strategy in STRATEGIES {
        let recorder = Recorder::default();
        evaluate(&source, 4, &options(strategy), &recorder).unwrap();
        let joined = recorder.joined.lock().unwrap().clone();
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.into_iter().collect::<BTreeSet<_>>(), expected);
    }
}

#[test]
fn test_pool_never_spawns_per_node() {
    let recorder = Recorder::default();
    let source = MemoryBackend::new(sample(256));
    evaluate(&source, 16, &options(Strategy::Pool), &recorder).unwrap();
    assert!(recorder.spawned.lock().unwrap().is_empty());
}

#[test]
fn test_every_node_hashed_once_and_root_last() {
    for strategy in STRATEGIES {
        let recorder = Recorder::default();
        let source = MemoryBackend::new(sample(1000));
        evaluate(&source, 10, &options(strategy), &recorder).unwrap();

        let mut hashed = recorder.hashed.lock().unwrap().clone();
        hashed.sort_unstable();
        assert_eq!(hashed, (0..10).collect::<Vec<_>>());

        let completed = recorder.completed.lock().unwrap().clone();
        assert_eq!(completed.len(), 10);
        assert_eq!(completed.last(), Some(&0));
        // A parent never completes before its children.
        let position = |i: usize| completed.iter().position(|&n| n == i).unwrap();
        for child in 1..10 {
            assert!(position((child - 1) / 2) > position(child));
        }
    }
}

#[test]
fn test_invalid_partitioning_is_rejected() {
    for strategy in STRATEGIES {
        assert!(matches!(
            run(b"abc", 0, strategy),
            Err(HtreeError::ZeroPartitions)
        ));
        assert!(matches!(
            run(b"abc", 4, strategy),
            Err(HtreeError::EmptyRegion {
                file_length: 3,
                partitions: 4
            })
        ));
        assert!(matches!(
            run(b"", 1, strategy),
            Err(HtreeError::EmptyRegion { .. })
        ));
    }
}

#[test]
fn test_one_byte_regions() {
    let data = sample(33);
    for strategy in STRATEGIES {
        assert_eq!(run(&data, 33, strategy).unwrap(), reference(&data, 33));
    }
}

/// Memory source whose view of one region fails.
struct FailingSource {
    inner: MemoryBackend,
    bad_offset: u64,
}

impl ByteSource for FailingSource {
    fn len(&self) -> u64 {
        self.inner.len()
    }

    fn view(&self, offset: u64, length: u64) -> Result<&[u8], HtreeError> {
        if offset == self.bad_offset {
            return Err(HtreeError::FileAccess {
                path: "failing".into(),
                source: std::io::Error::other(format!("unreadable at {offset}")),
            });
        }
        self.inner.view(offset, length)
    }
}

/// Panics while hashing the region of one node.
struct PanickingObserver {
    index: usize,
}

impl TreeObserver for PanickingObserver {
    fn region_hashed(&self, index: usize, _hash: HashValue) {
        if index == self.index {
            panic!("observer refused node {index}");
        }
    }
}

fn ancestors(mut index: usize) -> Vec<usize> {
    let mut chain = Vec::new();
    while index > 0 {
        index = (index - 1) / 2;
        chain.push(index);
    }
    chain
}

#[test]
fn test_failing_region_aborts_computation() {
    // 10 regions of 10 bytes: node 0 is the root, 1 and 4 are internal,
    // 5 and 9 are leaves.
    for bad_node in [0usize, 1, 4, 5, 9] {
        for strategy in STRATEGIES {
            let source = FailingSource {
                inner: MemoryBackend::new(sample(100)),
                bad_offset: bad_node as u64 * 10,
            };
            let recorder = Recorder::default();
            let result = evaluate(&source, 10, &options(strategy), &recorder);
            match result {
                Err(HtreeError::FileAccess { source: err, .. }) => {
                    assert_eq!(err.to_string(), format!("unreadable at {}", bad_node * 10));
                }
                other => panic!("node {bad_node} with {strategy}: unexpected {other:?}"),
            }

            // No node above the failure may have been combined.
            let completed = recorder.completed.lock().unwrap().clone();
            assert!(!completed.contains(&bad_node));
            for ancestor in ancestors(bad_node) {
                assert!(
                    !completed.contains(&ancestor),
                    "node {ancestor} completed without child input ({strategy})"
                );
            }
        }
    }
}

#[test]
fn test_panicking_unit_is_reported() {
    let source = MemoryBackend::new(sample(100));
    for strategy in STRATEGIES {
        let observer = PanickingObserver { index: 5 };
        let result = evaluate(&source, 10, &options(strategy), &observer);
        match result {
            Err(HtreeError::WorkerPanicked { thread }) => {
                assert!(thread.starts_with("htree-"), "unexpected thread {thread}");
            }
            other => panic!("{strategy}: expected a panicked unit, got {other:?}"),
        }
    }
}

#[test]
fn test_panicking_leaf_names_its_thread_in_spawn_mode() {
    let source = MemoryBackend::new(sample(100));
    let observer = PanickingObserver { index: 9 };
    let result = evaluate(&source, 10, &options(Strategy::Spawn), &observer);
    assert!(matches!(
        result,
        Err(HtreeError::WorkerPanicked { ref thread }) if thread == "htree-node-9"
    ));
}
