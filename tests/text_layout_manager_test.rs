use std::sync::Arc;
use std::thread;

use glam::Vec2;
use kryon_core::{AttributedString, Fragment, ParagraphAttributes, TextAttributes, TextDecoration};
use kryon_layout::{LayoutConstraints, LayoutDirection};
use kryon_text::{
    SharedTextLayoutManager, SimpleTextShaper, TextLayoutConfig, TextLayoutError, TextLayoutManager,
    TextRange,
};
use taffy::{AvailableSpace, Size};

fn text(value: &str) -> AttributedString {
    AttributedString::from(value).with_base_attributes(TextAttributes::new().with_font_size(10.0))
}

fn simple_manager(capacity: usize) -> TextLayoutManager<SimpleTextShaper> {
    TextLayoutManager::with_config(
        SimpleTextShaper::new(),
        TextLayoutConfig {
            cache_capacity: capacity,
        },
    )
}

#[test]
fn test_measure_is_deterministic_and_cached() {
    let manager = simple_manager(8);
    let paragraph = ParagraphAttributes::new();
    let constraints = LayoutConstraints::with_max_width(40.0);

    let first = manager.measure(&text("aaa bbb ccc"), &paragraph, &constraints).unwrap();
    let second = manager.measure(&text("aaa bbb ccc"), &paragraph, &constraints).unwrap();

    assert_eq!(first.size, Vec2::new(18.0, 36.0));
    assert!(Arc::ptr_eq(&first, &second));

    let stats = manager.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn test_restyled_text_reuses_measurement() {
    let manager = simple_manager(8);
    let paragraph = ParagraphAttributes::new();
    let constraints = LayoutConstraints::new();

    let plain = AttributedString::from_fragments(vec![
        Fragment::new("Hello "),
        Fragment::new("world").with_attributes(TextAttributes::new().with_font_size(20.0)),
    ]);
    let styled = AttributedString::from_fragments(vec![
        Fragment::new("Hello ").with_attributes(
            TextAttributes::new().with_text_decoration(TextDecoration::Underline),
        ),
        Fragment::new("world").with_attributes(
            TextAttributes::new()
                .with_font_size(20.0)
                .with_foreground_color(glam::Vec4::new(0.2, 0.4, 0.6, 1.0)),
        ),
    ]);

    let first = manager.measure(&plain, &paragraph, &constraints).unwrap();
    let second = manager.measure(&styled, &paragraph, &constraints).unwrap();
    assert_eq!(first, second);
    assert_eq!(manager.cache_stats().misses, 1);

    let bigger = AttributedString::from_fragments(vec![
        Fragment::new("Hello "),
        Fragment::new("world").with_attributes(TextAttributes::new().with_font_size(21.0)),
    ]);
    let third = manager.measure(&bigger, &paragraph, &constraints).unwrap();
    assert!(third.size.x > first.size.x);
    assert_eq!(manager.cache_stats().misses, 2);
}

#[test]
fn test_measure_lines_through_manager() {
    let manager = simple_manager(8);
    let paragraph = ParagraphAttributes::new();

    let lines = manager
        .measure_lines(&text("aaa bbb ccc"), &paragraph, Vec2::new(40.0, 24.0))
        .unwrap();

    // The third line does not fit in the 24 point box
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].range, TextRange::new(0, 4));
    assert_eq!(lines[1].range, TextRange::new(4, 4));
    assert_eq!(lines[1].frame.position.y, 12.0);

    let again = manager
        .measure_lines(&text("aaa bbb ccc"), &paragraph, Vec2::new(40.0, 24.0))
        .unwrap();
    assert_eq!(lines, again);
    assert_eq!(manager.cache_stats().hits, 1);

    let empty = manager
        .measure_lines(&AttributedString::new(), &paragraph, Vec2::new(40.0, 24.0))
        .unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_taffy_measure_arguments() {
    let manager = simple_manager(8);
    let paragraph = ParagraphAttributes::new();

    let definite = LayoutConstraints::from_taffy(
        Size {
            width: None,
            height: None,
        },
        Size {
            width: AvailableSpace::Definite(30.0),
            height: AvailableSpace::MaxContent,
        },
        LayoutDirection::LeftToRight,
    );
    let measurement = manager.measure(&text("Hello world"), &paragraph, &definite).unwrap();
    assert_eq!(measurement.size, Vec2::new(30.0, 24.0));

    let known_width = LayoutConstraints::from_taffy(
        Size {
            width: Some(100.0),
            height: None,
        },
        Size {
            width: AvailableSpace::MaxContent,
            height: AvailableSpace::MaxContent,
        },
        LayoutDirection::LeftToRight,
    );
    let measurement = manager.measure(&text("Hello"), &paragraph, &known_width).unwrap();
    assert_eq!(measurement.size, Vec2::new(100.0, 12.0));

    let min_content = LayoutConstraints::from_taffy(
        Size {
            width: None,
            height: None,
        },
        Size {
            width: AvailableSpace::MinContent,
            height: AvailableSpace::MaxContent,
        },
        LayoutDirection::LeftToRight,
    );
    let measurement = manager.measure(&text("Hello"), &paragraph, &min_content).unwrap();
    assert_eq!(measurement.size.x, 0.0);
}

#[test]
fn test_invalid_constraints_are_rejected() {
    let manager = simple_manager(8);
    let inverted = LayoutConstraints {
        minimum_size: Vec2::new(50.0, 0.0),
        maximum_size: Vec2::new(10.0, f32::INFINITY),
        ..LayoutConstraints::new()
    };

    let result = manager.measure(&text("Hello"), &ParagraphAttributes::new(), &inverted);
    assert!(matches!(result, Err(TextLayoutError::InvalidInput(_))));
    assert_eq!(manager.cached_entries(), 0);
}

#[test]
fn test_shared_manager_across_threads() {
    let manager: SharedTextLayoutManager<SimpleTextShaper> = Arc::new(simple_manager(4));
    let words = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"];
    let expected: Vec<Vec2> = words
        .iter()
        .map(|word| {
            simple_manager(1)
                .measure(&text(word), &ParagraphAttributes::new(), &LayoutConstraints::new())
                .unwrap()
                .size
        })
        .collect();

    thread::scope(|scope| {
        for worker in 0..6 {
            let manager = Arc::clone(&manager);
            let expected = &expected;
            scope.spawn(move || {
                for round in 0..50 {
                    let index = (worker + round) % words.len();
                    let measurement = manager
                        .measure(&text(words[index]), &ParagraphAttributes::new(), &LayoutConstraints::new())
                        .unwrap();
                    assert_eq!(measurement.size, expected[index]);
                }
            });
        }
    });

    assert!(manager.cached_entries() <= 4);
    let stats = manager.cache_stats();
    assert_eq!(stats.hits + stats.misses, 6 * 50);
}
