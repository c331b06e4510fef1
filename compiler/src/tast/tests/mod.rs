
mod package_access_test;
mod structure_test;
mod class_fields_test;
mod override_validation_test;
mod scheduler_test;
