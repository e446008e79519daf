pub mod taxonomy;
pub mod util;
pub mod yahoo_finance;
