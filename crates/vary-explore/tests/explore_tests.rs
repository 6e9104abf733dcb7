use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use vary_explore::generate::{generate_batch, generate_parallel};
use vary_explore::sampler::{sample, SampleError};
use vary_explore::space::{measure, remaining_space, SpaceError, SpaceSource};
use vary_ir::parse_schema;
use vary_ir::types::{round_to, Configuration, ConfigurationSchema, Value};
use vary_model::store::SampleStore;
use vary_sandbox::process::ProcessError;
use vary_sandbox::render::{PageGeometry, Rect, RenderError, RenderedDocument, Renderer};

fn schema() -> ConfigurationSchema {
    parse_schema(
        r#"{
            "booleans": ["ACK", "EMAIL"],
            "numbers": {"size": [0.6, 0.9, 2]},
            "enums": {"style": ["\\tiny", "\\small", "\\large"]},
            "choices": [["left", "center", "right"]]
        }"#,
    )
    .unwrap()
}

// ── Sampler ──────────────────────────────────────────────────────────

#[test]
fn test_numbers_stay_in_range_and_on_grid() {
    let schema = schema();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..10_000 {
        let config = sample(&schema, &Configuration::new(), &mut rng).unwrap();
        let v = config.get("size").and_then(Value::as_number).unwrap();
        assert!((0.6..=0.9).contains(&v), "{v} out of range");
        assert_eq!(v, round_to(v, 2));
    }
}

#[test]
fn test_exactly_one_choice_member() {
    let schema = schema();
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for _ in 0..1000 {
        let config = sample(&schema, &Configuration::new(), &mut rng).unwrap();
        let set = ["left", "center", "right"]
            .iter()
            .filter(|m| config.get(m) == Some(&Value::Bool(true)))
            .count();
        assert_eq!(set, 1);
    }
}

#[test]
fn test_every_variable_is_assigned() {
    let schema = schema();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let config = sample(&schema, &Configuration::new(), &mut rng).unwrap();
    for column in schema.variable_columns() {
        assert!(config.contains(&column), "{column} missing");
    }
    let style = config.get("style").and_then(Value::as_text).unwrap();
    assert!(["\\tiny", "\\small", "\\large"].contains(&style));
}

#[test]
fn test_fixed_values_are_kept() {
    let schema = schema();
    let mut fixed = Configuration::new();
    fixed.insert("ACK", false);
    fixed.insert("size", 0.75);
    fixed.insert("style", "\\large");
    fixed.insert("center", true);
    fixed.insert("left", false);

    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for _ in 0..100 {
        let config = sample(&schema, &fixed, &mut rng).unwrap();
        assert_eq!(config.get("ACK"), Some(&Value::Bool(false)));
        assert_eq!(config.get("size"), Some(&Value::Number(0.75)));
        assert_eq!(config.get("style"), Some(&Value::Text("\\large".to_string())));
        assert_eq!(config.get("center"), Some(&Value::Bool(true)));
        assert_eq!(config.get("left"), Some(&Value::Bool(false)));
        assert_eq!(config.get("right"), Some(&Value::Bool(false)));
    }
}

#[test]
fn test_last_fixed_choice_member_wins() {
    let schema = schema();
    let mut fixed = Configuration::new();
    fixed.insert("left", true);
    fixed.insert("right", true);
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let config = sample(&schema, &fixed, &mut rng).unwrap();
    assert_eq!(config.get("right"), Some(&Value::Bool(true)));
    assert_eq!(config.get("left"), Some(&Value::Bool(false)));
}

#[test]
fn test_fixed_value_of_wrong_kind() {
    let schema = schema();
    let mut fixed = Configuration::new();
    fixed.insert("ACK", "yes");
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let err = sample(&schema, &fixed, &mut rng).unwrap_err();
    assert!(matches!(err, SampleError::FixedValueKind { ref name, .. } if name == "ACK"));
}

#[test]
fn test_seeded_sampling_is_reproducible() {
    let schema = schema();
    let a = sample(&schema, &Configuration::new(), &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
    let b = sample(&schema, &Configuration::new(), &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
    assert_eq!(a, b);
}

// ── Space metric ─────────────────────────────────────────────────────

#[test]
fn test_single_block_in_the_middle_is_degenerate() {
    assert_eq!(remaining_space((0.0, 100.0), &[(40.0, 60.0)], true), Err(SpaceError::Degenerate));
}

#[test]
fn test_gap_between_two_blocks() {
    let space = remaining_space((0.0, 100.0), &[(10.0, 20.0), (70.0, 80.0)], true).unwrap();
    assert_eq!(space, 50.0);
}

#[test]
fn test_widest_gap_wins() {
    let blocks = [(10.0, 20.0), (30.0, 40.0), (70.0, 80.0), (85.0, 90.0)];
    let space = remaining_space((0.0, 100.0), &blocks, true).unwrap();
    assert_eq!(space, 30.0);
}

#[test]
fn test_bottom_gap_counts_without_page_number() {
    let blocks = [(10.0, 20.0), (30.0, 40.0)];
    assert_eq!(remaining_space((0.0, 100.0), &blocks, true).unwrap(), 10.0);
    assert_eq!(remaining_space((0.0, 100.0), &blocks, false).unwrap(), 60.0);
    assert_eq!(remaining_space((0.0, 100.0), &[(40.0, 60.0)], false).unwrap(), 40.0);
}

#[test]
fn test_overlapping_blocks() {
    let blocks = [(10.0, 30.0), (20.0, 40.0), (50.0, 60.0), (90.0, 95.0)];
    let space = remaining_space((0.0, 100.0), &blocks, true).unwrap();
    assert_eq!(space, 30.0);
}

fn page(blocks: &[[f64; 4]], crop_origin: [f64; 2]) -> PageGeometry {
    PageGeometry {
        rect: Rect::from([0.0, 0.0, 600.0, 100.0]),
        crop_origin,
        blocks: blocks.iter().map(|b| Rect::from(*b)).collect(),
    }
}

#[test]
fn test_measure_uses_last_page_and_crop_origin() {
    let doc = RenderedDocument {
        page_count: 2,
        pages: vec![
            page(&[[0.0, 10.0, 600.0, 90.0]], [0.0, 0.0]),
            page(&[[0.0, 10.0, 600.0, 20.0], [0.0, 70.0, 600.0, 80.0]], [0.0, 5.0]),
        ],
        reported_space: Some(-4.0),
    };
    assert_eq!(measure(&doc, SpaceSource::Geometry), Ok(50.0));
    assert_eq!(measure(&doc, SpaceSource::GeometryNoPageNumber), Ok(50.0));
    assert_eq!(measure(&doc, SpaceSource::TexIndicator), Ok(-4.0));
}

#[test]
fn test_measure_without_pages() {
    let doc = RenderedDocument {
        page_count: 0,
        pages: vec![],
        reported_space: None,
    };
    assert_eq!(measure(&doc, SpaceSource::Geometry), Err(SpaceError::NoPages));
    assert_eq!(measure(&doc, SpaceSource::TexIndicator), Err(SpaceError::NoIndicator));
}

// ── Generation ───────────────────────────────────────────────────────

/// Renders `ACK` documents on two pages, times out every fifth call and
/// returns a degenerate page every seventh.
struct ScriptedRenderer {
    calls: AtomicUsize,
}

impl ScriptedRenderer {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl Renderer for ScriptedRenderer {
    fn render(&self, config: &Configuration) -> Result<RenderedDocument, RenderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call % 5 == 0 {
            return Err(RenderError::Timeout(ProcessError::Timeout {
                program: "pdflatex".to_string(),
                timeout: Duration::from_secs(15),
            }));
        }
        let blocks: &[[f64; 4]] = if call % 7 == 0 {
            &[[0.0, 40.0, 600.0, 60.0]]
        } else {
            &[[0.0, 10.0, 600.0, 20.0], [0.0, 70.0, 600.0, 80.0]]
        };
        let pages = if config.get("ACK") == Some(&Value::Bool(true)) { 2 } else { 1 };
        Ok(RenderedDocument {
            page_count: pages,
            pages: vec![page(blocks, [0.0, 0.0])],
            reported_space: None,
        })
    }
}

#[test]
fn test_batch_drops_failed_samples() {
    let schema = schema();
    let renderer = ScriptedRenderer::new();
    let mut store = SampleStore::create(&schema);
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let report = generate_batch(
        &renderer,
        &schema,
        &Configuration::new(),
        35,
        SpaceSource::Geometry,
        &mut store,
        &mut rng,
    )
    .unwrap();

    // Calls 5, 10, .., 35 time out; 7, 14, 21, 28 are degenerate.
    assert_eq!(report.requested, 35);
    assert_eq!(report.timeouts, 7);
    assert_eq!(report.degenerate, 4);
    assert_eq!(report.failed, 0);
    assert_eq!(report.generated, 24);
    assert_eq!(store.len(), 24);
    for s in store.samples() {
        assert_eq!(s.space, 50.0);
        let ack = s.config.get("ACK") == Some(&Value::Bool(true));
        assert_eq!(s.nb_pages, if ack { 2 } else { 1 });
    }
}

#[test]
fn test_parallel_generation_keeps_draw_order() {
    let schema = schema();
    let renderer = ScriptedRenderer::new();
    let mut store = SampleStore::create(&schema);
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    let report = generate_parallel(
        &renderer,
        &schema,
        &Configuration::new(),
        20,
        SpaceSource::GeometryNoPageNumber,
        &mut store,
        &mut rng,
    )
    .unwrap();
    assert_eq!(report.requested, 20);
    assert_eq!(report.generated + report.dropped(), 20);
    assert_eq!(store.len(), report.generated);

    // Every kept sample is one of the configurations drawn from the same seed,
    // in the same relative order.
    let mut replay = ChaCha8Rng::seed_from_u64(2);
    let drawn: Vec<Configuration> = (0..20)
        .map(|_| sample(&schema, &Configuration::new(), &mut replay).unwrap())
        .collect();
    let mut cursor = drawn.iter();
    for s in store.samples() {
        assert!(cursor.any(|c| *c == s.config));
    }
}

#[test]
fn test_wrong_fixed_value_aborts_batch() {
    let schema = schema();
    let renderer = ScriptedRenderer::new();
    let mut store = SampleStore::create(&schema);
    let mut fixed = Configuration::new();
    fixed.insert("size", true);

    let result = generate_batch(
        &renderer,
        &schema,
        &fixed,
        3,
        SpaceSource::Geometry,
        &mut store,
        &mut ChaCha8Rng::seed_from_u64(1),
    );
    assert!(result.is_err());
    assert!(store.is_empty());
}
