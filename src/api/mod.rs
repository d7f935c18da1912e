pub mod query_aux;
