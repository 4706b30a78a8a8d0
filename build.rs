// Generates the `storage_backend.StorageBackend` server and client stubs.
//
// Message types are plain prost structs in `src/storage_backend/proto.rs`, so
// no protoc installation is needed to build the crate.

use tonic_build::manual::{Builder, Method, Service};

const PROTO_MODULE: &str = "crate::storage_backend::proto";
const CODEC: &str = "tonic_prost::ProstCodec";

const METHODS: &[(&str, &str, &str)] = &[
    ("get_value", "GetValue", "GetValue"),
    ("get_locked_by", "GetLockedBy", "GetLockedBy"),
    ("on_create", "OnCreate", "OnCreate"),
    ("on_update", "OnUpdate", "OnUpdate"),
    ("on_delete", "OnDelete", "OnDelete"),
    ("on_lock", "OnLock", "OnLock"),
    ("on_unlock", "OnUnlock", "OnUnlock"),
];

fn main() {
    let mut service = Service::builder()
        .name("StorageBackend")
        .package("storage_backend")
        .comment("Storage backend for TypeInstance values and lock state");

    for (name, route, message) in METHODS {
        service = service.method(
            Method::builder()
                .name(*name)
                .route_name(*route)
                .input_type(format!("{PROTO_MODULE}::{message}Request"))
                .output_type(format!("{PROTO_MODULE}::{message}Response"))
                .codec_path(CODEC)
                .build(),
        );
    }

    Builder::new().compile(&[service.build()]);
    println!("cargo:rerun-if-changed=build.rs");
}
