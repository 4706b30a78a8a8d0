//! Wire messages of the `storage_backend.StorageBackend` gRPC service.
//!
//! The server and client stubs are generated by `build.rs` and included at the
//! bottom of this module as `storage_backend_server` and `storage_backend_client`.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetValueRequest {
    #[prost(string, tag = "1")]
    pub type_instance_id: ::prost::alloc::string::String,
    #[prost(uint32, tag = "2")]
    pub resource_version: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub context: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetValueResponse {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub value: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetLockedByRequest {
    #[prost(string, tag = "1")]
    pub type_instance_id: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub context: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetLockedByResponse {
    #[prost(string, optional, tag = "1")]
    pub locked_by: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnCreateRequest {
    #[prost(string, tag = "1")]
    pub type_instance_id: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub context: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnCreateResponse {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub context: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnUpdateRequest {
    #[prost(string, tag = "1")]
    pub type_instance_id: ::prost::alloc::string::String,
    #[prost(uint32, tag = "2")]
    pub new_resource_version: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub new_value: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub context: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnUpdateResponse {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub context: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnDeleteRequest {
    #[prost(string, tag = "1")]
    pub type_instance_id: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub context: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnDeleteResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnLockRequest {
    #[prost(string, tag = "1")]
    pub type_instance_id: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub context: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, tag = "3")]
    pub locked_by: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnLockResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnUnlockRequest {
    #[prost(string, tag = "1")]
    pub type_instance_id: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub context: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnUnlockResponse {}

include!(concat!(env!("OUT_DIR"), "/storage_backend.StorageBackend.rs"));
