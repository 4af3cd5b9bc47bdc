#![allow(dead_code)]

use image::{Rgb, RgbImage};
use qrcode::{Color, QrCode};
use sheetqr::tools::{dataset_iter, dataset_root_from_env};
use std::path::PathBuf;

pub fn collect_dataset_images() -> (PathBuf, Vec<PathBuf>) {
    let root = dataset_root_from_env();
    let limit = std::env::var("SHEETQR_BENCH_LIMIT")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok());

    let images: Vec<PathBuf> = dataset_iter(&root, limit).collect();
    (root, images)
}

/// White sheet with `count` codes laid out on a grid, `module` px per module
pub fn synthetic_sheet(count: usize, module: u32) -> RgbImage {
    let cell = 40 * module;
    let cols = 4u32;
    let rows = (count as u32).div_ceil(cols);
    let mut sheet = RgbImage::from_pixel(cols * cell, rows.max(1) * cell, Rgb([255, 255, 255]));

    for i in 0..count {
        let Ok(code) = QrCode::new(format!("ID;{i};CEN;46000000{i:05};").as_bytes()) else {
            continue;
        };
        let width = code.width() as u32;
        let colors = code.to_colors();
        let (ox, oy) = ((i as u32 % cols) * cell + 4 * module, (i as u32 / cols) * cell + 4 * module);
        for (idx, color) in colors.iter().enumerate() {
            if *color != Color::Dark {
                continue;
            }
            let (mx, my) = (idx as u32 % width, idx as u32 / width);
            for dy in 0..module {
                for dx in 0..module {
                    sheet.put_pixel(ox + mx * module + dx, oy + my * module + dy, Rgb([0, 0, 0]));
                }
            }
        }
    }
    sheet
}
