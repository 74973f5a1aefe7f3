#![allow(dead_code)]
use herdcache_core::{Sex, Student};

/// The reference result set for the `all` query.
pub fn reference_students() -> Vec<Student> {
    vec![
        Student::new("zhangsan1", 23, Sex::Man),
        Student::new("zhangsan2", 24, Sex::Man),
        Student::new("zhangsan3", 25, Sex::Man),
    ]
}

/// A collection containing structurally duplicated records.
pub fn students_with_duplicates() -> Vec<Student> {
    vec![
        Student::new("lisi2", 24, Sex::Man),
        Student::new("lisi2", 24, Sex::Man),
        Student::new("lisi3", 24, Sex::Woman),
    ]
}
