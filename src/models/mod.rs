pub mod answer;
pub mod ids;
pub mod question;
pub mod test_result;
