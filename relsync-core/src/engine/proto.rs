//! Wire messages and client for the `authzed.api.v1.PermissionsService`.
//!
//! Only the subset used by [`GrpcEngine`](super::GrpcEngine) is declared.
//! Field tags follow the upstream `authzed/api` protobuf definitions; fields
//! not listed here are skipped by the decoder.

#![allow(clippy::all)]

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObjectReference {
    #[prost(string, tag = "1")]
    pub object_type: String,
    #[prost(string, tag = "2")]
    pub object_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubjectReference {
    #[prost(message, optional, tag = "1")]
    pub object: Option<ObjectReference>,
    #[prost(string, tag = "2")]
    pub optional_relation: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Relationship {
    #[prost(message, optional, tag = "1")]
    pub resource: Option<ObjectReference>,
    #[prost(string, tag = "2")]
    pub relation: String,
    #[prost(message, optional, tag = "3")]
    pub subject: Option<SubjectReference>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ZedToken {
    #[prost(string, tag = "1")]
    pub token: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Consistency {
    #[prost(oneof = "consistency::Requirement", tags = "1, 2, 3, 4")]
    pub requirement: Option<consistency::Requirement>,
}

pub mod consistency {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Requirement {
        #[prost(bool, tag = "1")]
        MinimizeLatency(bool),
        #[prost(message, tag = "2")]
        AtLeastAsFresh(super::ZedToken),
        #[prost(message, tag = "3")]
        AtExactSnapshot(super::ZedToken),
        #[prost(bool, tag = "4")]
        FullyConsistent(bool),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckPermissionRequest {
    #[prost(message, optional, tag = "1")]
    pub consistency: Option<Consistency>,
    #[prost(message, optional, tag = "2")]
    pub resource: Option<ObjectReference>,
    #[prost(string, tag = "3")]
    pub permission: String,
    #[prost(message, optional, tag = "4")]
    pub subject: Option<SubjectReference>,
    #[prost(message, optional, tag = "5")]
    pub context: Option<::prost_types::Struct>,
    #[prost(bool, tag = "6")]
    pub with_tracing: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckPermissionResponse {
    #[prost(message, optional, tag = "1")]
    pub checked_at: Option<ZedToken>,
    #[prost(enumeration = "CheckPermissionResponsePermissionship", tag = "2")]
    pub permissionship: i32,
    #[prost(message, optional, tag = "3")]
    pub partial_caveat_info: Option<PartialCaveatInfo>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CheckPermissionResponsePermissionship {
    Unspecified = 0,
    NoPermission = 1,
    HasPermission = 2,
    ConditionalPermission = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PartialCaveatInfo {
    #[prost(string, repeated, tag = "1")]
    pub missing_required_context: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RelationshipUpdate {
    #[prost(enumeration = "relationship_update::Operation", tag = "1")]
    pub operation: i32,
    #[prost(message, optional, tag = "2")]
    pub relationship: Option<Relationship>,
}

pub mod relationship_update {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Operation {
        Unspecified = 0,
        Create = 1,
        Touch = 2,
        Delete = 3,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteRelationshipsRequest {
    #[prost(message, repeated, tag = "1")]
    pub updates: Vec<RelationshipUpdate>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteRelationshipsResponse {
    #[prost(message, optional, tag = "1")]
    pub written_at: Option<ZedToken>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cursor {
    #[prost(string, tag = "1")]
    pub token: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LookupResourcesRequest {
    #[prost(message, optional, tag = "1")]
    pub consistency: Option<Consistency>,
    #[prost(string, tag = "2")]
    pub resource_object_type: String,
    #[prost(string, tag = "3")]
    pub permission: String,
    #[prost(message, optional, tag = "4")]
    pub subject: Option<SubjectReference>,
    #[prost(message, optional, tag = "5")]
    pub context: Option<::prost_types::Struct>,
    #[prost(uint32, tag = "6")]
    pub optional_limit: u32,
    #[prost(message, optional, tag = "7")]
    pub optional_cursor: Option<Cursor>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LookupResourcesResponse {
    #[prost(message, optional, tag = "1")]
    pub looked_up_at: Option<ZedToken>,
    #[prost(string, tag = "2")]
    pub resource_object_id: String,
    #[prost(enumeration = "LookupPermissionship", tag = "3")]
    pub permissionship: i32,
    #[prost(message, optional, tag = "4")]
    pub partial_caveat_info: Option<PartialCaveatInfo>,
    #[prost(message, optional, tag = "5")]
    pub after_result_cursor: Option<Cursor>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum LookupPermissionship {
    Unspecified = 0,
    HasPermission = 1,
    ConditionalPermission = 2,
}

/// Permissions service client over a tonic [`Channel`](tonic::transport::Channel).
pub mod permissions_service_client {
    use tonic::codegen::http::uri::PathAndQuery;
    use tonic::transport::Channel;

    #[derive(Debug, Clone)]
    pub struct PermissionsServiceClient {
        inner: tonic::client::Grpc<Channel>,
    }

    impl PermissionsServiceClient {
        pub fn new(channel: Channel) -> Self {
            Self {
                inner: tonic::client::Grpc::new(channel),
            }
        }

        async fn ready(&mut self) -> Result<(), tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| tonic::Status::unavailable(format!("service was not ready: {e}")))
        }

        pub async fn check_permission(
            &mut self,
            request: tonic::Request<super::CheckPermissionRequest>,
        ) -> Result<tonic::Response<super::CheckPermissionResponse>, tonic::Status> {
            self.ready().await?;
            let codec = tonic::codec::ProstCodec::default();
            let path = PathAndQuery::from_static(
                "/authzed.api.v1.PermissionsService/CheckPermission",
            );
            self.inner.unary(request, path, codec).await
        }

        pub async fn write_relationships(
            &mut self,
            request: tonic::Request<super::WriteRelationshipsRequest>,
        ) -> Result<tonic::Response<super::WriteRelationshipsResponse>, tonic::Status> {
            self.ready().await?;
            let codec = tonic::codec::ProstCodec::default();
            let path = PathAndQuery::from_static(
                "/authzed.api.v1.PermissionsService/WriteRelationships",
            );
            self.inner.unary(request, path, codec).await
        }

        pub async fn lookup_resources(
            &mut self,
            request: tonic::Request<super::LookupResourcesRequest>,
        ) -> Result<
            tonic::Response<tonic::codec::Streaming<super::LookupResourcesResponse>>,
            tonic::Status,
        > {
            self.ready().await?;
            let codec = tonic::codec::ProstCodec::default();
            let path = PathAndQuery::from_static(
                "/authzed.api.v1.PermissionsService/LookupResources",
            );
            self.inner.server_streaming(request, path, codec).await
        }
    }
}
