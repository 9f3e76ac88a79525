mod integration {
    pub mod common;
    mod notify_tests;
    mod versioning_tests;
}
