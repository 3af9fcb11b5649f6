use glam::Vec2;
use image::Rgba;
use std::sync::Arc;
use voxel_space::config::RenderSettings;
use voxel_space::{Camera, Color, FrameBuffer, FrameDispatcher, TerrainField};

const SKY: Color = Rgba([255, 0, 255, 255]);
const GROUND: Color = Rgba([40, 120, 40, 255]);
const SPIKE: Color = Rgba([250, 250, 250, 255]);

fn settings(workers: usize) -> RenderSettings {
    RenderSettings {
        workers: Some(workers),
        ..RenderSettings::default()
    }
}

fn hills() -> Arc<TerrainField> {
    let field = TerrainField::from_fn(256, 256, 1.0, |x, y| {
        let h = ((x as f32 / 11.0).sin() * (y as f32 / 7.0).cos() + 1.0) * 60.0;
        (h, Rgba([(x * 3) as u8, (y * 5) as u8, 90, 255]))
    })
    .unwrap();
    Arc::new(field)
}

fn flat() -> Arc<TerrainField> {
    Arc::new(TerrainField::from_fn(512, 512, 1.0, |_, _| (0.0, GROUND)).unwrap())
}

fn hill_camera() -> Camera {
    let mut camera = Camera::new(Vec2::new(140.0, 180.0), 400.0);
    camera.angle = 0.6;
    camera.height = 150.0;
    camera.horizon = 40.0;
    camera
}

fn render(dispatcher: &mut FrameDispatcher, width: usize, height: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; width * height * 4];
    let mut frame = FrameBuffer::packed(&mut bytes, width, height).unwrap();
    dispatcher.render_frame(&mut frame).unwrap();
    bytes
}

fn render_once(terrain: Arc<TerrainField>, camera: Camera, workers: usize, width: usize, height: usize) -> Vec<u8> {
    let mut dispatcher = FrameDispatcher::new(camera, terrain, &settings(workers)).unwrap();
    render(&mut dispatcher, width, height)
}

fn pixel(bytes: &[u8], width: usize, x: usize, y: usize) -> Color {
    let pos = (y * width + x) * 4;
    Rgba([bytes[pos + 2], bytes[pos + 1], bytes[pos], bytes[pos + 3]])
}

fn column(bytes: &[u8], width: usize, height: usize, x: usize) -> Vec<Color> {
    (0..height).map(|y| pixel(bytes, width, x, y)).collect()
}

#[test]
fn repeated_frames_are_byte_identical() {
    let mut dispatcher = FrameDispatcher::new(hill_camera(), hills(), &settings(4)).unwrap();
    let first = render(&mut dispatcher, 160, 120);
    let second = render(&mut dispatcher, 160, 120);
    assert_eq!(first, second);
    assert_eq!(dispatcher.frames_rendered(), 2);

    let fresh = render_once(hills(), hill_camera(), 4, 160, 120);
    assert_eq!(first, fresh);
}

#[test]
fn worker_count_does_not_change_output() {
    let (width, height) = (203, 150);
    let reference = render_once(hills(), hill_camera(), 1, width, height);
    for workers in [2, 3, 7, 16, 203] {
        let output = render_once(hills(), hill_camera(), workers, width, height);
        assert!(output == reference, "{workers} workers rendered a different frame");
    }
}

#[test]
fn every_pixel_is_drawn() {
    let (width, height) = (120, 90);
    let sentinel = [1u8, 2, 3, 4];
    let mut bytes = sentinel.repeat(width * height);
    let mut dispatcher = FrameDispatcher::new(hill_camera(), hills(), &settings(5)).unwrap();
    {
        let mut frame = FrameBuffer::packed(&mut bytes, width, height).unwrap();
        dispatcher.render_frame(&mut frame).unwrap();
    }
    assert!(bytes.chunks_exact(4).all(|px| px != sentinel));
}

#[test]
fn flat_terrain_splits_at_horizon() {
    let mut camera = Camera::new(Vec2::new(0.0, 260.0), 2000.0);
    camera.height = 100.0;
    camera.horizon = 50.0;
    let (width, height) = (800, 600);
    let bytes = render_once(flat(), camera, 10, width, height);

    // the farthest ground sample sits just inside the render distance
    let horizon_row = (100.0 * 240.0 / 2000.0 + 50.0) as usize;
    assert_eq!(horizon_row, 62);

    let expected: Vec<Color> = (0..height)
        .map(|y| if y < horizon_row { SKY } else { GROUND })
        .collect();
    for x in 0..width {
        assert_eq!(column(&bytes, width, height, x), expected, "column {x}");
    }
}

#[test]
fn height_spike_raises_only_columns_that_cross_it() {
    let spiked = Arc::new(
        TerrainField::from_fn(512, 512, 1.0, |x, y| {
            if x == 256 && (290..300).contains(&y) {
                (200.0, SPIKE)
            } else {
                (0.0, GROUND)
            }
        })
        .unwrap(),
    );
    let mut camera = Camera::new(Vec2::new(256.5, 400.0), 600.0);
    camera.height = 100.0;
    camera.horizon = 50.0;
    let (width, height) = (200, 150);

    let baseline = render_once(flat(), camera, 4, width, height);
    let output = render_once(spiked, camera, 4, width, height);

    let raised: Vec<usize> = (0..width)
        .filter(|&x| column(&output, width, height, x).contains(&SPIKE))
        .collect();
    assert!(raised.contains(&(width / 2)), "centre column missed the spike: {raised:?}");
    assert!(raised.windows(2).all(|w| w[1] == w[0] + 1), "raised columns not contiguous: {raised:?}");
    assert!(raised.iter().all(|x| (80..=120).contains(x)), "spike leaked sideways: {raised:?}");

    for x in 0..width {
        let same = column(&output, width, height, x) == column(&baseline, width, height, x);
        assert_eq!(same, !raised.contains(&x), "column {x}");
    }
}

#[test]
fn pool_follows_framebuffer_resize() {
    let mut dispatcher = FrameDispatcher::new(hill_camera(), hills(), &settings(6)).unwrap();
    let wide = render(&mut dispatcher, 150, 80);
    let narrow = render(&mut dispatcher, 64, 80);
    assert_eq!(wide, render_once(hills(), hill_camera(), 6, 150, 80));
    assert_eq!(narrow, render_once(hills(), hill_camera(), 6, 64, 80));
}

#[test]
fn more_workers_than_columns_still_renders() {
    let narrow = render_once(hills(), hill_camera(), 16, 5, 40);
    let single = render_once(hills(), hill_camera(), 1, 5, 40);
    assert_eq!(narrow, single);
}

#[test]
fn zero_workers_is_rejected() {
    assert!(FrameDispatcher::new(hill_camera(), hills(), &settings(0)).is_err());
}

#[test]
fn explicit_snapshot_leaves_owned_camera_alone() {
    let mut dispatcher = FrameDispatcher::new(hill_camera(), hills(), &settings(3)).unwrap();
    let mut moved = hill_camera();
    moved.translate(Vec2::new(0.0, -40.0));

    let mut bytes = vec![0u8; 90 * 60 * 4];
    {
        let mut frame = FrameBuffer::packed(&mut bytes, 90, 60).unwrap();
        dispatcher.render_with(moved, &mut frame).unwrap();
    }
    assert_eq!(*dispatcher.camera(), hill_camera());
    assert_eq!(bytes, render_once(hills(), moved, 3, 90, 60));
    assert_ne!(bytes, render_once(hills(), hill_camera(), 3, 90, 60));

    dispatcher.camera_mut().translate(Vec2::new(0.0, -40.0));
    assert_eq!(render(&mut dispatcher, 90, 60), bytes);
}

#[test]
fn row_padding_is_left_untouched() {
    let (width, height, pitch) = (40, 30, 40 * 4 + 12);
    let mut bytes = vec![0xEEu8; pitch * height];
    let mut dispatcher = FrameDispatcher::new(hill_camera(), hills(), &settings(3)).unwrap();
    {
        let mut frame = FrameBuffer::new(&mut bytes, width, height, pitch, 4).unwrap();
        dispatcher.render_frame(&mut frame).unwrap();
    }
    let packed = render_once(hills(), hill_camera(), 3, width, height);
    for y in 0..height {
        let row = &bytes[y * pitch..(y + 1) * pitch];
        assert_eq!(&row[..width * 4], &packed[y * width * 4..(y + 1) * width * 4]);
        assert!(row[width * 4..].iter().all(|&b| b == 0xEE));
    }
}

#[test]
fn fog_only_changes_terrain_pixels() {
    let (width, height) = (100, 80);
    let clear = render_once(hills(), hill_camera(), 2, width, height);
    let fog_settings = RenderSettings {
        workers: Some(2),
        fog_amount: 0.8,
        ..RenderSettings::default()
    };
    let mut dispatcher = FrameDispatcher::new(hill_camera(), hills(), &fog_settings).unwrap();
    let foggy = render(&mut dispatcher, width, height);

    assert_ne!(clear, foggy);
    for x in 0..width {
        for y in 0..height {
            if pixel(&clear, width, x, y) == SKY {
                assert_eq!(pixel(&foggy, width, x, y), SKY);
            }
        }
    }
}

#[test]
fn unbounded_march_parameters_are_rejected() {
    for settings in [
        RenderSettings {
            depth_step_growth: -0.5,
            ..settings(2)
        },
        RenderSettings {
            depth_step_growth: f32::NAN,
            ..settings(2)
        },
        RenderSettings {
            focal_length: 0.0,
            ..settings(2)
        },
        RenderSettings {
            focal_length: f32::INFINITY,
            ..settings(2)
        },
    ] {
        assert!(FrameDispatcher::new(hill_camera(), hills(), &settings).is_err());
    }
}

#[test]
fn non_finite_camera_fails_the_frame() {
    let mut dispatcher = FrameDispatcher::new(hill_camera(), hills(), &settings(2)).unwrap();
    let mut bytes = vec![0u8; 32 * 24 * 4];
    let mut frame = FrameBuffer::packed(&mut bytes, 32, 24).unwrap();

    let mut endless = hill_camera();
    endless.distance = f32::INFINITY;
    assert!(dispatcher.render_with(endless, &mut frame).is_err());

    dispatcher.camera_mut().height = f32::NAN;
    assert!(dispatcher.render_frame(&mut frame).is_err());

    dispatcher.camera_mut().height = hill_camera().height;
    dispatcher.render_frame(&mut frame).unwrap();
}

#[test]
fn over_budget_frames_still_complete() {
    let (width, height) = (640, 480);
    let tight = RenderSettings {
        workers: Some(4),
        frame_budget_ms: 1,
        ..RenderSettings::default()
    };
    let mut camera = hill_camera();
    camera.distance = 4000.0;
    let mut dispatcher = FrameDispatcher::new(camera, hills(), &tight).unwrap();
    let slow = render(&mut dispatcher, width, height);
    assert_eq!(slow, render_once(hills(), camera, 4, width, height));
}
