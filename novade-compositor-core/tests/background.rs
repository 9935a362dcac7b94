use novade_compositor_core::{
    install_background, BackendConfig, BackendContext, BackendSelector, Color, GeometryError, OutputGeometry, Rectangle, Region,
    RenderingMode, SceneRoot, Transform,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn headless() -> novade_compositor_core::ActiveBackend {
    let config = BackendConfig {
        rendering_mode: RenderingMode::Software,
        input_enabled: false,
        ..BackendConfig::default()
    };
    BackendSelector::with_builtin()
        .initialize(&config, BackendContext::default())
        .unwrap()
}

#[rstest]
#[case(Transform::Normal, 800, 600, 1, (800, 600))]
#[case(Transform::Normal, 1, 1, 1, (1, 1))]
#[case(Transform::Rotate90, 1920, 1080, 1, (1080, 1920))]
#[case(Transform::Flipped180, 1024, 768, 1, (1024, 768))]
#[case(Transform::Normal, 3840, 2160, 2, (1920, 1080))]
#[case(Transform::Rotate270, 2560, 1440, 2, (720, 1280))]
#[case(Transform::Normal, 2, 2, 2, (1, 1))]
#[case(Transform::Rotate90, 3, 5, 3, (1, 1))]
fn background_opaque_region_covers_output(
    #[case] transform: Transform,
    #[case] width: i32,
    #[case] height: i32,
    #[case] scale: i32,
    #[case] logical: (i32, i32),
) {
    let mut backend = headless();
    let geometry = OutputGeometry::new(transform, width, height, scale).unwrap();
    let output = backend.create_output(None, geometry).unwrap();

    let mut scene = SceneRoot::new();
    let bg = install_background(&mut scene, &output, Color::new(0.5, 0.5, 0.5, 1.0).unwrap()).unwrap();

    let expected = Region::from_rect(Rectangle::from_size(logical.0, logical.1));
    let surface = scene.surface(bg.surface).unwrap();
    assert_eq!(surface.opaque_region(), &expected);
    assert_eq!(surface.pending_damage(), &expected);
    assert_eq!(scene.render_order(), vec![bg.view]);
}

#[test]
fn first_frame_repaints_background_then_goes_idle() {
    let mut backend = headless();
    let geometry = OutputGeometry::new(Transform::Normal, 800, 600, 1).unwrap();
    let output = backend.create_output(None, geometry).unwrap();
    let mut scene = SceneRoot::new();
    let bg = install_background(&mut scene, &output, Color::BLACK).unwrap();

    let first = backend.repaint(&output, &mut scene).unwrap();
    assert_eq!(first.repainted, vec![bg.surface]);
    assert_eq!(first.damaged_area, 800 * 600);

    assert!(backend.repaint(&output, &mut scene).unwrap().is_idle());

    // Damaging again twice still only repaints the surface once.
    scene.surface_mut(bg.surface).unwrap().damage();
    scene.surface_mut(bg.surface).unwrap().damage();
    let again = backend.repaint(&output, &mut scene).unwrap();
    assert_eq!(again.damaged_area, 800 * 600);
}

#[test]
fn output_geometry_rejects_zero_sized_modes() {
    assert!(OutputGeometry::new(Transform::Normal, 0, 600, 1).is_err());
    assert!(OutputGeometry::new(Transform::Normal, 800, 0, 1).is_err());
}

#[rstest]
#[case(1, 1, 2)]
#[case(1920, 1, 2)]
#[case(4, 4, 5)]
fn output_geometry_rejects_scales_larger_than_the_mode(#[case] width: i32, #[case] height: i32, #[case] scale: i32) {
    assert_eq!(
        OutputGeometry::new(Transform::Normal, width, height, scale),
        Err(GeometryError::ScaleExceedsMode { scale, width, height })
    );
}
