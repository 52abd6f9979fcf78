//! 客户端拦截器集成测试

use flare_grpc_xray::{
    ClientInterceptor, Recorder, RequestDescriptor, SamplingDecision, ServerInterceptor,
    TRACE_HEADER_KEY, TraceContext, TraceHeader,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tonic::{Code, Request, Response, Status};

#[derive(Clone, PartialEq, prost::Message)]
struct GetOrder {
    #[prost(string, tag = "1")]
    order_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
struct Order {
    #[prost(string, tag = "1")]
    order_id: String,
    #[prost(uint32, tag = "2")]
    quantity: u32,
}

fn active_context(header: &str) -> TraceContext {
    let segment = Recorder::default().begin_segment(
        "checkout",
        &RequestDescriptor::default(),
        &TraceHeader::parse(header),
    );
    TraceContext::new().with_segment(segment)
}

#[tokio::test]
async fn missing_segment_never_invokes() {
    let interceptor = ClientInterceptor::new("orders.internal:50051");
    let calls = AtomicUsize::new(0);

    let status = interceptor
        .intercept::<_, Order, _, _>(
            &TraceContext::new(),
            "/orders.Orders/Get",
            Request::new(GetOrder::default()),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Status::internal("should not be called")) }
            },
        )
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::FailedPrecondition);
    assert!(status.message().contains("segment cannot be found"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unavailable_is_fault_and_error_is_untouched() {
    let ctx = active_context("Root=1-abc;Sampled=1");
    let interceptor = ClientInterceptor::new("orders.internal:50051");

    let status = interceptor
        .intercept::<_, Order, _, _>(
            &ctx,
            "/orders.Orders/Get",
            Request::new(GetOrder {
                order_id: "o-1".to_string(),
            }),
            |_| async { Err(Status::unavailable("connection refused")) },
        )
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unavailable);
    assert_eq!(status.message(), "connection refused");
    assert!(status.metadata().is_empty());

    let subsegments = ctx.segment().unwrap().subsegments();
    assert_eq!(subsegments.len(), 1);
    assert!(subsegments[0].is_closed());

    let data = subsegments[0].lock();
    assert!(data.fault);
    assert!(!data.error && !data.throttle);
    assert_eq!(data.namespace, "remote");
    assert_eq!(data.http.request.url, "grpc://orders.internal:50051/orders.Orders/Get");
    assert_eq!(data.http.request.method, "POST");

    // 父段本身不会被客户端调用分类
    let parent = ctx.segment().unwrap().lock();
    assert!(!parent.fault);
}

#[tokio::test]
async fn records_reply_size() {
    let ctx = active_context("");
    let interceptor = ClientInterceptor::new("orders.internal:50051");
    let order = Order {
        order_id: "o-42".to_string(),
        quantity: 3,
    };
    let expected = prost::Message::encoded_len(&order);

    let response = interceptor
        .intercept(
            &ctx,
            "/orders.Orders/Get",
            Request::new(GetOrder::default()),
            |_| async move { Ok(Response::new(order)) },
        )
        .await
        .unwrap();
    assert_eq!(response.get_ref().quantity, 3);

    let subsegments = ctx.segment().unwrap().subsegments();
    assert_eq!(subsegments[0].lock().http.response.content_length, expected);
}

#[tokio::test]
async fn not_sampled_decision_propagates() {
    let ctx = active_context("Root=1-def;Sampled=0");
    let interceptor = ClientInterceptor::new("orders.internal:50051");

    interceptor
        .intercept(
            &ctx,
            "/orders.Orders/Get",
            Request::new(GetOrder::default()),
            |req| {
                let header = req
                    .metadata()
                    .get(TRACE_HEADER_KEY)
                    .and_then(|v| v.to_str().ok())
                    .map(TraceHeader::parse)
                    .unwrap_or_default();
                assert_eq!(header.trace_id, "1-def");
                assert_eq!(header.sampling_decision, SamplingDecision::NotSampled);
                async { Ok(Response::new(())) }
            },
        )
        .await
        .unwrap();
}

/// 服务端 handler 内发起下游调用：子段挂在服务端段下，追踪 ID 贯穿两跳
#[tokio::test]
async fn server_handler_calls_downstream() {
    let server = ServerInterceptor::default();
    let client = Arc::new(ClientInterceptor::new("inventory.internal:50051"));

    let mut req = Request::new(GetOrder::default());
    req.metadata_mut()
        .insert(TRACE_HEADER_KEY, "Root=1-hop;Sampled=1".parse().unwrap());

    let response = server
        .intercept("/orders.Orders/Get", req, |req| {
            let client = Arc::clone(&client);
            async move {
                let ctx = TraceContext::from_request(&req).expect("derived context");
                let downstream = client
                    .intercept(
                        &ctx,
                        "/inventory.Inventory/Reserve",
                        Request::new(()),
                        |req| async move {
                            let raw = req
                                .metadata()
                                .get(TRACE_HEADER_KEY)
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or_default()
                                .to_string();
                            Ok(Response::new(TraceHeader::parse(&raw).trace_id))
                        },
                    )
                    .await?;

                let subsegments = ctx.segment().map(|s| s.subsegments()).unwrap_or_default();
                assert_eq!(subsegments.len(), 1);
                Ok::<_, Status>(Response::new(downstream.into_inner()))
            }
        })
        .await
        .unwrap();

    assert_eq!(response.get_ref(), "1-hop");
}
