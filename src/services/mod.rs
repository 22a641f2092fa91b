pub(crate) mod answer_key;
pub(crate) mod document_text;
pub(crate) mod paper_generation;
pub(crate) mod question_bank;
pub(crate) mod question_import;
pub(crate) mod question_parser;
pub(crate) mod slot_layout;
pub(crate) mod tabular_import;
