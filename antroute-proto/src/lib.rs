//! Generated gRPC types for the `antroute.v1` package.

tonic::include_proto!("antroute.v1");
