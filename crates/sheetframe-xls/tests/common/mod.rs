pub mod xls_fixture_builder;
