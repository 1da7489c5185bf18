//! Sidebar module for navigation

mod draw;

pub use draw::draw_sidebar;

/// Sidebar navigation items, selected with keys 1-6
pub const SIDEBAR_ITEMS: &[&str] = &[
    "Dasbor",
    "Siswa",
    "Guru",
    "Pengumuman",
    "Ekspor Rapor",
    "Konfigurasi",
];
