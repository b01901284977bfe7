pub mod browser;
pub mod control_switch;
pub mod event_map;
pub mod screen;
pub mod shell;
pub mod theme;
pub mod value;
pub mod widget;
