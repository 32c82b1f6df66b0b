mod alter_table;
mod common;
mod documents;
mod update;
