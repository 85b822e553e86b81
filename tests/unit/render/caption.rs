use super::*;

fn system_font() -> Option<Arc<Vec<u8>>> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok())
    .map(Arc::new)
}

#[test]
fn garbage_font_bytes_are_rejected() {
    assert!(CaptionLayoutEngine::new(Arc::new(b"not a font".to_vec())).is_err());
}

#[test]
fn long_caption_wraps_and_stays_centered_near_bottom() {
    let Some(font) = system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let canvas = Canvas {
        width: 640,
        height: 360,
    };
    let style = CaptionStyle::default();
    let mut engine = CaptionLayoutEngine::new(font).unwrap();
    assert!(!engine.family_name().trim().is_empty());

    let short = engine.layout("Hello", &style, canvas).unwrap();
    assert_eq!(short.line_count, 1);
    assert!(!short.runs.is_empty());

    let long = engine
        .layout(
            "A considerably longer caption that cannot possibly fit on a single line of this canvas",
            &style,
            canvas,
        )
        .unwrap();
    assert!(long.line_count > 1);

    for block in [&short, &long] {
        let p = block.panel;
        let center = (p.x0 + p.x1) / 2.0;
        assert!((center - 320.0).abs() < 1.0);
        assert!((p.y1 - (360.0 - 0.08 * 360.0)).abs() < 1e-3);
        assert!(p.width() <= 640.0 * 0.8 + 2.0 * 18.0 + 1.0);
        for run in &block.runs {
            for g in &run.glyphs {
                assert!(f64::from(g.x) >= p.x0 - 1.0 && f64::from(g.x) <= p.x1);
                assert!(f64::from(g.y) >= p.y0 && f64::from(g.y) <= p.y1);
            }
        }
    }
    assert!(long.panel.height() > short.panel.height());
}
