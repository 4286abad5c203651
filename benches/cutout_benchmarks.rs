//! Performance benchmarks for imageops-cutout
//!
//! Measures every refinement stage on its own and the full pipeline with a
//! mock segmenter, so regressions can be traced to a single stage.

use std::sync::Arc;

use criterion::*;
use image::{Luma, Rgb, Rgba};
use imageops_cutout::{
    AlphaMatting, BuildTrimapExt, CanvasSpec, ClosedFormMatting, ComponentFilterConfig,
    CompositeExt, DenoiseAlphaExt, DenoiseConfig, Fill, FilterComponentsExt, Image,
    MattingConfig, Pipeline, RefineConfig, SegmentationError, Segmenter, TrimapConfig,
};
use itertools::iproduct;
use std::hint::black_box;

/// Helper function to create a test RGB image with specific dimensions
fn create_rgb_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    let mut image: Image<Rgb<u8>> = Image::new(width, height);

    iproduct!(0..height, 0..width).for_each(|(y, x)| {
        let r = ((x * 255) / width) as u8;
        let g = ((y * 255) / height) as u8;
        let b = ((x + y) * 255 / (width + height)) as u8;
        image.put_pixel(x, y, Rgb([r, g, b]));
    });

    image
}

/// Segmentation-like mask: a soft disc plus a few small specks near the top
fn create_alpha_mask(width: u32, height: u32) -> Image<Luma<u8>> {
    let mut mask: Image<Luma<u8>> = Image::new(width, height);

    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let radius = (width.min(height) as f32) / 3.0;

    iproduct!(0..height, 0..width).for_each(|(y, x)| {
        let distance = (x as f32 - center_x).hypot(y as f32 - center_y);
        let alpha = (255.0 * (radius + 2.0 - distance) / 4.0).clamp(0.0, 255.0) as u8;
        mask.put_pixel(x, y, Luma([alpha]));
    });

    for i in 0..4 {
        let x0 = width / 10 + i * width / 5;
        iproduct!(2..6, x0..x0 + 4).for_each(|(y, x)| {
            if x < width && y < height {
                mask.put_pixel(x, y, Luma([255]));
            }
        });
    }

    mask
}

struct MaskSegmenter {
    alpha: Image<Luma<u8>>,
}

impl Segmenter for MaskSegmenter {
    fn segment(&self, image: &Image<Rgb<u8>>) -> Result<Image<Rgba<u8>>, SegmentationError> {
        Ok(Image::from_fn(image.width(), image.height(), |x, y| {
            let Rgb([r, g, b]) = *image.get_pixel(x, y);
            Rgba([r, g, b, self.alpha.get_pixel(x, y)[0]])
        }))
    }
}

fn bench_denoise(c: &mut Criterion) {
    let sizes = vec![(320, 320), (1000, 1000)];

    let mut group = c.benchmark_group("denoise_alpha");
    group.sample_size(10);

    for (width, height) in sizes {
        group.throughput(Throughput::Elements((width * height) as u64));
        let mask = create_alpha_mask(width, height);

        group.bench_with_input(
            BenchmarkId::new("denoise_alpha", format!("{}x{}", width, height)),
            &mask,
            |b, m| b.iter(|| black_box(m.denoise_alpha(&DenoiseConfig::default()).unwrap())),
        );
    }

    group.finish();
}

fn bench_component_filter(c: &mut Criterion) {
    let sizes = vec![(320, 320), (1000, 1000)];
    let passes = vec![
        ("watermark", ComponentFilterConfig::watermark_pass()),
        ("refinement", ComponentFilterConfig::refinement_pass()),
    ];

    let mut group = c.benchmark_group("filter_components");
    group.sample_size(10);

    for ((width, height), (name, config)) in iproduct!(sizes, passes) {
        group.throughput(Throughput::Elements((width * height) as u64));
        let mask = create_alpha_mask(width, height);

        group.bench_with_input(
            BenchmarkId::new(name, format!("{}x{}", width, height)),
            &(mask, config),
            |b, (m, cfg)| b.iter(|| black_box(m.filter_components(cfg).unwrap())),
        );
    }

    group.finish();
}

fn bench_trimap(c: &mut Criterion) {
    let kernels = vec![2u8, 8, 16];
    let mask = create_alpha_mask(500, 500);

    let mut group = c.benchmark_group("build_trimap");
    group.sample_size(10);
    group.throughput(Throughput::Elements(500 * 500));

    for kernel in kernels {
        let config = TrimapConfig::default().with_kernel_size(kernel);
        group.bench_with_input(
            BenchmarkId::new("build_trimap", format!("k{}", kernel)),
            &config,
            |b, cfg| b.iter(|| black_box(mask.build_trimap(cfg))),
        );
    }

    group.finish();
}

fn bench_closed_form_matting(c: &mut Criterion) {
    let sizes = vec![(64, 64), (160, 160)];

    let mut group = c.benchmark_group("closed_form_matting");
    group.sample_size(10);

    for (width, height) in sizes {
        group.throughput(Throughput::Elements((width * height) as u64));

        let image: Image<Rgb<f32>> = create_rgb_image(width, height).convert();
        let trimap = create_alpha_mask(width, height)
            .build_trimap(&TrimapConfig::default().with_kernel_size(4))
            .to_unit();
        let solver = ClosedFormMatting::new(&MattingConfig::default());

        group.bench_with_input(
            BenchmarkId::new("estimate_alpha", format!("{}x{}", width, height)),
            &(image, trimap),
            |b, (img, tri)| b.iter(|| black_box(solver.estimate_alpha(img, tri).unwrap())),
        );
    }

    group.finish();
}

fn bench_composite(c: &mut Criterion) {
    let cases = vec![
        ((400, 400), (600, 600)),
        ((1000, 2000), (600, 600)),
        ((1920, 1080), (800, 800)),
    ];

    let mut group = c.benchmark_group("composite");
    group.sample_size(10);

    for ((width, height), (target_w, target_h)) in cases {
        group.throughput(Throughput::Elements((width * height) as u64));

        let subject = Image::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, if (x + y) % 7 == 0 { 128 } else { 255 }])
        });
        let canvas = CanvasSpec::new(target_w, target_h, Fill::White).unwrap();

        group.bench_with_input(
            BenchmarkId::new(
                "composite_onto",
                format!("{}x{}_to_{}x{}", width, height, target_w, target_h),
            ),
            &subject,
            |b, s| b.iter(|| black_box(s.composite_onto(&canvas))),
        );
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let (width, height) = (200, 200);
    let image = create_rgb_image(width, height);
    let alpha = create_alpha_mask(width, height);
    let canvas = CanvasSpec::new(300, 300, Fill::White).unwrap();

    let configs = vec![
        ("with_matting", RefineConfig::new()),
        (
            "without_matting",
            RefineConfig::new().with_matting(MattingConfig::default().with_enabled(false)),
        ),
    ];

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    group.throughput(Throughput::Elements((width * height) as u64));

    for (name, config) in configs {
        let pipeline = Pipeline::new(
            Arc::new(MaskSegmenter {
                alpha: alpha.clone(),
            }),
            config,
        )
        .unwrap();

        group.bench_with_input(
            BenchmarkId::new("process", name),
            &image,
            |b, img| b.iter(|| black_box(pipeline.process(img, &canvas).unwrap())),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_denoise,
    bench_component_filter,
    bench_trimap,
    bench_closed_form_matting,
    bench_composite,
    bench_pipeline,
);
criterion_main!(benches);
