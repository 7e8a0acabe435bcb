use bracketfold_core::decorator::InlineRange;
use bracketfold_core::{
    visible_intervals, DocumentId, FoldingConfig, FoldingEngine, Language, LineInterval,
    Position, TextEdit, ViewId,
};
use std::time::{Duration, Instant};

const SOURCE: &str = "\
function a() {
  one();
  two();
}

function b() {
  three();
}";

fn setup() -> (FoldingEngine, DocumentId, ViewId) {
    let mut engine = FoldingEngine::new(FoldingConfig::default()).unwrap();
    let id = DocumentId::new("view.js");
    engine.open_document(id.clone(), Language::JavaScript, SOURCE);
    let view = ViewId::new("left");
    engine.open_view(view.clone(), &id).unwrap();
    (engine, id, view)
}

#[test]
fn folding_the_first_function_hides_its_body() {
    let (mut engine, id, view) = setup();
    let ranges = engine.folding_ranges(&id).unwrap().to_vec();
    assert_eq!(ranges.len(), 2);

    let report = visible_intervals(&ranges[..1], 8);
    assert_eq!(report, vec![LineInterval::new(0, 0), LineInterval::new(4, 7)]);

    let plan = engine
        .visible_ranges_changed(&view, &report, Instant::now())
        .unwrap()
        .unwrap();
    assert_eq!(plan.folded_count(), 1);
    assert_eq!(
        plan.folded["{…}"],
        vec![InlineRange {
            start: Position::new(0, 13),
            end: Position::new(0, 14),
        }]
    );
    assert_eq!(plan.unfolded, vec![ranges[1].clone()]);
}

#[test]
fn fold_at_end_of_document_is_inferred() {
    let (mut engine, id, view) = setup();
    let ranges = engine.folding_ranges(&id).unwrap().to_vec();

    let report = visible_intervals(&ranges[1..], 8);
    assert_eq!(report, vec![LineInterval::new(0, 5)]);
    engine
        .visible_ranges_changed(&view, &report, Instant::now())
        .unwrap();

    assert!(!engine.is_folded(&view, &ranges[0]).unwrap());
    assert!(engine.is_folded(&view, &ranges[1]).unwrap());
    assert!(engine.fold_state(&view).unwrap().boundaries().contains(&5));
}

#[test]
fn expanding_everything_clears_the_state() {
    let (mut engine, _id, view) = setup();
    let start = Instant::now();
    engine
        .visible_ranges_changed(
            &view,
            &[LineInterval::new(0, 0), LineInterval::new(4, 7)],
            start,
        )
        .unwrap();
    assert_eq!(engine.fold_state(&view).unwrap().boundaries().len(), 1);

    engine
        .visible_ranges_changed(&view, &[LineInterval::new(0, 7)], start + Duration::from_secs(1))
        .unwrap();
    assert!(engine.fold_state(&view).unwrap().boundaries().is_empty());
}

#[test]
fn reports_inside_the_window_update_state_without_a_plan() {
    let (mut engine, _id, view) = setup();
    let start = Instant::now();
    let folded = [LineInterval::new(0, 0), LineInterval::new(4, 7)];

    assert!(engine
        .visible_ranges_changed(&view, &[LineInterval::new(0, 7)], start)
        .unwrap()
        .is_some());
    assert!(engine
        .visible_ranges_changed(&view, &folded, start + Duration::from_millis(10))
        .unwrap()
        .is_none());
    assert!(engine.fold_state(&view).unwrap().boundaries().contains(&0));
    assert_eq!(engine.visible_intervals(&view).unwrap(), &folded[..]);

    let plan = engine
        .visible_ranges_changed(&view, &folded, start + Duration::from_millis(150))
        .unwrap();
    assert_eq!(plan.map(|plan| plan.folded_count()), Some(1));
}

#[test]
fn two_views_keep_separate_state() {
    let (mut engine, id, left) = setup();
    let right = ViewId::new("right");
    engine.open_view(right.clone(), &id).unwrap();
    let now = Instant::now();

    engine
        .visible_ranges_changed(&left, &[LineInterval::new(0, 0), LineInterval::new(4, 7)], now)
        .unwrap();
    engine
        .visible_ranges_changed(&right, &[LineInterval::new(0, 7)], now)
        .unwrap();

    assert_eq!(engine.decorations(&left).unwrap().folded_count(), 1);
    assert_eq!(engine.decorations(&right).unwrap().folded_count(), 0);
}

#[test]
fn decorations_follow_edits() {
    let (mut engine, id, view) = setup();
    engine
        .visible_ranges_changed(
            &view,
            &[LineInterval::new(0, 0), LineInterval::new(4, 7)],
            Instant::now(),
        )
        .unwrap();

    engine
        .apply_edits(&id, &[TextEdit::insert(Position::new(0, 11), "x")])
        .unwrap();
    let plan = engine.decorations(&view).unwrap();
    assert_eq!(
        plan.folded["{…}"][0].start,
        Position::new(0, 14),
    );
}

#[test]
fn closing_the_document_drops_its_views() {
    let (mut engine, id, view) = setup();
    engine.close_document(&id);
    assert!(engine.fold_state(&view).is_none());
    assert!(engine.decorations(&view).is_err());
    assert!(engine.folding_ranges(&id).is_err());
}
