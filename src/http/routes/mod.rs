// One router per resource; handlers only extract, delegate to services and shape the response.

pub mod activity;
pub mod attachments;
pub mod auth;
pub mod companies;
pub mod exports;
pub mod leads;
pub mod master_data;
pub mod opportunities;
pub mod partners;
pub mod quotations;
pub mod roles;
pub mod services;
pub mod users;
