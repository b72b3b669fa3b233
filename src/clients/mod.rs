pub mod doc_service_client;
