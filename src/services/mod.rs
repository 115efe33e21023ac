pub mod cache;
pub mod calendar;
pub mod combined_menus;
pub mod company_menus;
pub mod copier;
pub mod fanout;
pub mod metrics;
pub mod projection;
pub mod structures;
