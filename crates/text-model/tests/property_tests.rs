use proptest::prelude::*;
use text_model::{
    EditOperation, ModelDecorationOptions, ModelDeltaDecoration, ModelId, Position, Range,
    TextModel, TextModelOptions, TrackedRangeStickiness,
};

fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("a"),
            Just("xyz"),
            Just(" "),
            Just("é"),
            Just("😀"),
            Just("\n"),
            Just("\r\n"),
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

fn arb_insert_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![Just("b"), Just("😀"), Just("\n"), Just("  ")],
        0..6,
    )
    .prop_map(|parts| parts.concat())
}

fn arb_stickiness() -> impl Strategy<Value = TrackedRangeStickiness> {
    prop_oneof![
        Just(TrackedRangeStickiness::AlwaysGrowsWhenTypingAtEdges),
        Just(TrackedRangeStickiness::NeverGrowsWhenTypingAtEdges),
        Just(TrackedRangeStickiness::GrowsOnlyWhenTypingBefore),
        Just(TrackedRangeStickiness::GrowsOnlyWhenTypingAfter),
    ]
}

fn model(text: &str) -> TextModel {
    TextModel::new(ModelId::new(1), text, TextModelOptions::default())
}

/// Valid position at roughly `fraction / u16::MAX` through the document.
fn position_at_fraction(m: &TextModel, fraction: u16) -> Position {
    let length = m.value_length().unwrap();
    let offset = length * fraction as usize / u16::MAX as usize;
    m.validate_position(m.position_at(offset).unwrap()).unwrap()
}

proptest! {
    /// Every valid position survives offset conversion.
    #[test]
    fn position_offset_round_trip(text in arb_text()) {
        let m = model(&text);
        for line in 1..=m.line_count().unwrap() {
            for column in 1..=m.line_max_column(line).unwrap() {
                let position = Position::new(line, column);
                if m.is_valid_position(position).unwrap() {
                    let offset = m.offset_at(position).unwrap();
                    prop_assert_eq!(m.position_at(offset).unwrap(), position);
                }
            }
        }
    }

    /// Validation is idempotent and always yields valid coordinates.
    #[test]
    fn validation_is_idempotent(
        text in arb_text(),
        start in (0usize..12, 0usize..40),
        end in (0usize..12, 0usize..40),
    ) {
        let m = model(&text);
        let position = m.validate_position(Position::new(start.0, start.1)).unwrap();
        prop_assert_eq!(m.validate_position(position).unwrap(), position);
        prop_assert!(m.is_valid_position(position).unwrap());

        let range = m.validate_range(Range::new(start.0, start.1, end.0, end.1)).unwrap();
        prop_assert_eq!(m.validate_range(range).unwrap(), range);
        prop_assert!(m.is_valid_range(range).unwrap());
    }

    /// Applying a batch and then its reverse edits restores the text, whatever the input order.
    #[test]
    fn reverse_edits_restore_text(
        text in arb_text(),
        cuts in prop::collection::vec(any::<u16>(), 2..8),
        inserts in prop::collection::vec(arb_insert_text(), 4),
        rotation in 0usize..4,
        reversed in any::<bool>(),
    ) {
        let mut m = model(&text);
        let original = m.value().unwrap();

        let mut cuts = cuts;
        cuts.sort_unstable();
        // Consecutive windows share their boundaries, so neighbouring ranges touch.
        let mut operations: Vec<EditOperation> = cuts
            .windows(2)
            .zip(&inserts)
            .map(|(pair, insert)| {
                let range = Range::from_positions(
                    position_at_fraction(&m, pair[0]),
                    position_at_fraction(&m, pair[1]),
                );
                EditOperation::replace(range, insert.as_str())
            })
            .collect();
        if reversed {
            operations.reverse();
        }
        let rotation = rotation % operations.len();
        operations.rotate_left(rotation);

        let reverse = m.apply_edits(&operations, true).unwrap().unwrap();
        prop_assert_eq!(reverse.len(), operations.len());
        m.apply_edits(&reverse, false).unwrap();
        prop_assert_eq!(m.value().unwrap(), original);
    }

    /// Undo returns to the previous text, redo to the edited one.
    #[test]
    fn undo_redo_round_trip(
        text in arb_text(),
        cuts in (any::<u16>(), any::<u16>()),
        insert in arb_insert_text(),
    ) {
        let mut m = model(&text);
        let before = m.value().unwrap();
        let range = Range::from_positions(
            position_at_fraction(&m, cuts.0),
            position_at_fraction(&m, cuts.1),
        );
        m.push_edit_operations(&[EditOperation::replace(range, insert.as_str())]).unwrap();
        let after = m.value().unwrap();

        if m.undo().unwrap() {
            prop_assert_eq!(m.value().unwrap(), before);
            prop_assert!(m.redo().unwrap());
        }
        prop_assert_eq!(m.value().unwrap(), after);
    }

    /// Decorations never invert and never split a surrogate pair.
    #[test]
    fn decorations_stay_valid(
        text in arb_text(),
        decoration in (any::<u16>(), any::<u16>(), arb_stickiness()),
        edits in prop::collection::vec(
            (any::<u16>(), any::<u16>(), arb_insert_text(), any::<bool>()),
            1..8,
        ),
    ) {
        let mut m = model(&text);
        let range = Range::from_positions(
            position_at_fraction(&m, decoration.0),
            position_at_fraction(&m, decoration.1),
        );
        let options = ModelDecorationOptions::new("prop").with_stickiness(decoration.2);
        let id = m
            .delta_decorations(0, &[], &[ModelDeltaDecoration::new(range, options)])
            .unwrap()[0];

        for (a, b, insert, force) in edits {
            let range =
                Range::from_positions(position_at_fraction(&m, a), position_at_fraction(&m, b));
            m.apply_edits(
                &[EditOperation::replace(range, insert.as_str()).with_force_move_markers(force)],
                false,
            )
            .unwrap();

            let tracked = m.decoration_range(id).unwrap().unwrap();
            prop_assert!(tracked.start <= tracked.end);
            prop_assert!(m.is_valid_range(tracked).unwrap());
            let start = m.offset_at(tracked.start).unwrap();
            let end = m.offset_at(tracked.end).unwrap();
            prop_assert!(start <= end && end <= m.value_length().unwrap());
        }
    }

    /// A snapshot yields exactly the model's text.
    #[test]
    fn snapshot_matches_value(text in arb_text(), bom in any::<bool>()) {
        let source = if bom { format!("\u{FEFF}{text}") } else { text.clone() };
        let m = model(&source);
        let expected = m.value_with(text_model::EndOfLinePreference::TextDefined, true).unwrap();
        prop_assert_eq!(m.create_snapshot(true).unwrap().read_to_string(), expected);
    }
}
