mod integration {
    pub mod common;
    mod user_tests;
}
