pub mod handlers;
pub mod preview_area;
pub mod report_modal;
pub mod results;
pub mod sidebar;
pub mod upload_section;
pub mod utils;
