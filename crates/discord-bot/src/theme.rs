//! Shared emoji, colours and artwork.

pub const EVENT: &str = "🎉";
pub const ERROR: &str = "⚠️";

/// Matches the dark theme's embed background.
pub const TRANSPARENT: u32 = 0x2b2d31;
pub const CANCELLED: u32 = 0xff0000;

pub const LOBBY: u32 = 0xffb900;
pub const GAME_STARTED: u32 = 0x0ad919;
pub const DAY: u32 = 0xeee8d0;
pub const VOTING: u32 = 0x857d6a;
pub const NIGHT: u32 = 0x3d91e4;
pub const MURDER: u32 = 0xaf775c;
pub const VERDICT: u32 = 0xff4600;
pub const TIE: u32 = 0xffcc00;
pub const KILL: u32 = 0xff0000;
pub const GAME_OVER: u32 = 0xff0000;

pub const DAY_IMAGE: &str = "https://i.ibb.co/cgLG0hT/a5ebb4a1724c6f7723be838042384e93.jpg";
pub const VOTING_THUMBNAIL: &str = "https://i.ibb.co/Ks4D36d/Untitled64-20240727213018.png";
pub const NIGHT_IMAGE: &str = "https://i.ibb.co/St4bJXG/08ed16834b55bb50bd6381c6fdf4401d.jpg";
pub const MURDER_THUMBNAIL: &str = "https://i.ibb.co/9Tf2jkT/Untitled65-20240727213246.png";
