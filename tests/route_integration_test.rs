//! 路由引擎集成测试
//!
//! 通过公开 API 搭建小型拓扑，验证各路由纪律与关闭传播

use chips_flow::{
    dispatch, error_code, normalize_all, Channel, ChannelRegistry, ChannelSlot, CoreError,
    RouteKind, RouteSpec, SelectSlot,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// 测试辅助
// ============================================================================

/// 为一组规格分配通道，外部输入用 `in` 声明
fn topology(specs: &[RouteSpec], external: &[&str]) -> ChannelRegistry {
    let declared = RouteSpec::declare(external.iter().copied());
    let aliases = normalize_all(specs.iter().chain(std::iter::once(&declared)));
    ChannelRegistry::allocate(&aliases, 16)
}

fn channel(registry: &ChannelRegistry, alias: &str) -> Channel {
    registry.resolve(alias).unwrap()
}

/// 在后台送入值后关闭
fn feed(ch: Channel, values: Vec<Value>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        for value in values {
            ch.send(value).await.unwrap();
        }
        ch.close();
    })
}

async fn drain(ch: &Channel) -> Vec<Value> {
    let mut out = Vec::new();
    while let Some(value) = ch.recv().await {
        out.push(value);
    }
    out
}

fn ints(range: std::ops::Range<i64>) -> Vec<Value> {
    range.map(|i| json!(i)).collect()
}

fn sorted(mut values: Vec<Value>) -> Vec<Value> {
    values.sort_by_key(|v| v.as_i64().unwrap_or_default());
    values
}

// ============================================================================
// 广播族
// ============================================================================

/// scatter a -> [b, c]：两个输出都收到完整序列，并在 a 关闭后关闭
#[tokio::test]
async fn test_scatter_example() {
    let spec = RouteSpec::scatter("a", ["b", "c"]);
    let registry = topology(std::slice::from_ref(&spec), &["a"]);
    let handle = dispatch(spec, &registry).unwrap();

    feed(channel(&registry, "a"), ints(1..4));

    let b = drain(&channel(&registry, "b")).await;
    let c = drain(&channel(&registry, "c")).await;
    assert_eq!(b, ints(1..4));
    assert_eq!(c, ints(1..4));

    let exit = handle.join().await.unwrap();
    assert_eq!(exit.kind, RouteKind::Scatter);
    assert_eq!(exit.stats.received, 3);
    assert_eq!(exit.stats.sent, 6);
    assert_eq!(exit.stats.dropped, 0);
}

/// 输出槽上的变换在发送时生效
#[tokio::test]
async fn test_slot_transform_applies_per_output() {
    let spec = RouteSpec::scatter(
        "a",
        vec![
            ChannelSlot::with_transform("doubled", |v: Value| json!(v.as_i64().unwrap_or(0) * 2)),
            ChannelSlot::new("plain"),
        ],
    );
    let registry = topology(std::slice::from_ref(&spec), &["a"]);
    dispatch(spec, &registry).unwrap();

    feed(channel(&registry, "a"), ints(0..3));

    assert_eq!(drain(&channel(&registry, "doubled")).await, vec![json!(0), json!(2), json!(4)]);
    assert_eq!(drain(&channel(&registry, "plain")).await, ints(0..3));
}

/// splatter 按位置投影，多余的元素或输出被忽略
#[tokio::test]
async fn test_splatter_projection() {
    let spec = RouteSpec::splatter("pairs", ["first", "second", "third"]);
    let registry = topology(std::slice::from_ref(&spec), &["pairs"]);
    dispatch(spec, &registry).unwrap();

    feed(
        channel(&registry, "pairs"),
        vec![json!([1, "x"]), json!([2, "y", true, "extra"]), json!([3])],
    );

    assert_eq!(drain(&channel(&registry, "first")).await, ints(1..4));
    assert_eq!(
        drain(&channel(&registry, "second")).await,
        vec![json!("x"), json!("y")]
    );
    assert_eq!(drain(&channel(&registry, "third")).await, vec![json!(true)]);
}

/// splatter 收到非序列值时异常终止，不关闭输出
#[tokio::test]
async fn test_splatter_rejects_non_sequence() {
    let spec = RouteSpec::splatter("in", ["out"]);
    let registry = topology(std::slice::from_ref(&spec), &["in"]);
    let handle = dispatch(spec, &registry).unwrap();

    feed(channel(&registry, "in"), vec![json!({"not": "an array"})]);

    let err = handle.join().await.unwrap_err();
    assert_eq!(err.error_code(), error_code::ROUTE_INVALID_VALUE);
    assert!(err.is_worker_failure());
    assert!(!channel(&registry, "out").is_closed());
}

/// spread 第 i 个输出收到位置 i, i+N, ...
#[tokio::test]
async fn test_spread_round_robin() {
    let spec = RouteSpec::spread("jobs", ["w0", "w1", "w2"]);
    let registry = topology(std::slice::from_ref(&spec), &["jobs"]);
    dispatch(spec, &registry).unwrap();

    feed(channel(&registry, "jobs"), ints(0..8));

    assert_eq!(drain(&channel(&registry, "w0")).await, vec![json!(0), json!(3), json!(6)]);
    assert_eq!(drain(&channel(&registry, "w1")).await, vec![json!(1), json!(4), json!(7)]);
    assert_eq!(drain(&channel(&registry, "w2")).await, vec![json!(2), json!(5)]);
}

// ============================================================================
// 条件路由
// ============================================================================

/// select 把值送到所有选择值匹配的输出，无匹配时丢弃
#[tokio::test]
async fn test_select_dispatch() {
    let spec = RouteSpec::select(
        "events",
        vec![
            SelectSlot::new("numbers", json!("n")),
            SelectSlot::new("audit", json!("n")),
            SelectSlot::new("strings", json!("s")),
        ],
        |v: &Value| -> anyhow::Result<Value> { Ok(v["type"].clone()) },
    );
    let registry = topology(std::slice::from_ref(&spec), &["events"]);
    let handle = dispatch(spec, &registry).unwrap();

    let values = vec![
        json!({"type": "n", "v": 1}),
        json!({"type": "s", "v": "a"}),
        json!({"type": "other"}),
        json!({"type": "n", "v": 2}),
    ];
    feed(channel(&registry, "events"), values.clone());

    let numbers = vec![values[0].clone(), values[3].clone()];
    assert_eq!(drain(&channel(&registry, "numbers")).await, numbers);
    assert_eq!(drain(&channel(&registry, "audit")).await, numbers);
    assert_eq!(drain(&channel(&registry, "strings")).await, vec![values[1].clone()]);

    let exit = handle.join().await.unwrap();
    assert_eq!(exit.stats.received, 4);
    assert_eq!(exit.stats.sent, 5);
}

// ============================================================================
// 汇合族
// ============================================================================

/// gather 产出的元组数等于最短输入的长度
#[tokio::test]
async fn test_gather_truncates_to_shortest() {
    let spec = RouteSpec::gather(["left", "right"], "pairs");
    let registry = topology(std::slice::from_ref(&spec), &["left", "right"]);
    let handle = dispatch(spec, &registry).unwrap();

    feed(channel(&registry, "left"), ints(0..5));
    feed(channel(&registry, "right"), vec![json!("a"), json!("b")]);

    assert_eq!(
        drain(&channel(&registry, "pairs")).await,
        vec![json!([0, "a"]), json!([1, "b"])]
    );
    handle.join().await.unwrap();
}

/// union 输出是所有输入的多重集并，且在全部输入关闭后才关闭
#[tokio::test]
async fn test_union_waits_for_every_input() {
    let spec = RouteSpec::union(["p", "q", "r"], "merged");
    let registry = topology(std::slice::from_ref(&spec), &["p", "q", "r"]);
    let handle = dispatch(spec, &registry).unwrap();
    let merged = channel(&registry, "merged");

    feed(channel(&registry, "p"), ints(0..3)).await.unwrap();
    feed(channel(&registry, "q"), ints(3..6)).await.unwrap();
    let r = channel(&registry, "r");
    r.send(json!(6)).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..7 {
        seen.push(merged.recv().await.unwrap());
    }
    assert_eq!(sorted(seen), ints(0..7));

    let pending = tokio::time::timeout(Duration::from_millis(50), merged.recv()).await;
    assert!(pending.is_err(), "r 仍然打开时 merged 不应关闭");
    assert!(!handle.is_finished());

    r.close();
    assert_eq!(merged.recv().await, None);
    assert_eq!(handle.join().await.unwrap().stats.received, 7);
}

/// 并发生产者下 union 仍保持每个输入内部的顺序
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_union_concurrent_producers() {
    let spec = RouteSpec::union(["p", "q"], "merged");
    let registry = topology(std::slice::from_ref(&spec), &["p", "q"]);
    dispatch(spec, &registry).unwrap();

    feed(channel(&registry, "p"), ints(0..200));
    feed(channel(&registry, "q"), ints(1000..1200));

    let merged = drain(&channel(&registry, "merged")).await;
    assert_eq!(merged.len(), 400);

    let from_p: Vec<Value> = merged.iter().filter(|v| v.as_i64() < Some(1000)).cloned().collect();
    let from_q: Vec<Value> = merged.iter().filter(|v| v.as_i64() >= Some(1000)).cloned().collect();
    assert_eq!(from_p, ints(0..200));
    assert_eq!(from_q, ints(1000..1200));
}

// ============================================================================
// 终端路由
// ============================================================================

/// sink 按顺序观察到每个值，且不关闭任何通道
#[tokio::test]
async fn test_sink_observes_all_values() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let spec = RouteSpec::sink("logs", move |v: Value| -> anyhow::Result<()> {
        seen_clone.lock().unwrap().push(v);
        Ok(())
    });
    let registry = topology(&[], &["logs", "unrelated"]);
    let handle = dispatch(spec, &registry).unwrap();

    feed(channel(&registry, "logs"), ints(0..10));
    let exit = handle.join().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), ints(0..10));
    assert_eq!(exit.stats.received, 10);
    assert_eq!(exit.stats.sent, 0);
    assert!(!channel(&registry, "unrelated").is_closed());
}

/// collect 在输入关闭后发出一次最终结果
#[tokio::test]
async fn test_collect_fold() {
    let spec = RouteSpec::collect(
        "numbers",
        "total",
        |acc: Value, v: Value| -> anyhow::Result<Value> {
            Ok(json!(acc.as_i64().unwrap_or(0) + v.as_i64().unwrap_or(0)))
        },
        json!(0),
    );
    let registry = topology(std::slice::from_ref(&spec), &["numbers"]);
    dispatch(spec, &registry).unwrap();

    feed(channel(&registry, "numbers"), ints(1..11));
    assert_eq!(drain(&channel(&registry, "total")).await, vec![json!(55)]);
}

/// 归约函数失败：join 返回 CallbackFailed，输出保持打开
#[tokio::test]
async fn test_callback_failure_is_distinct_from_shutdown() {
    let spec = RouteSpec::collect(
        "numbers",
        "total",
        |acc: Value, v: Value| -> anyhow::Result<Value> {
            if v == json!(3) {
                anyhow::bail!("不接受 3");
            }
            Ok(json!(acc.as_i64().unwrap_or(0) + v.as_i64().unwrap_or(0)))
        },
        json!(0),
    );
    let registry = topology(std::slice::from_ref(&spec), &["numbers"]);
    let handle = dispatch(spec, &registry).unwrap();

    feed(channel(&registry, "numbers"), ints(1..5));

    let err = handle.join().await.unwrap_err();
    match err {
        CoreError::CallbackFailed { kind, ref route_id, .. } => {
            assert_eq!(kind, RouteKind::Collect);
            assert!(route_id.starts_with("collect-"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!channel(&registry, "total").is_closed());
}

// ============================================================================
// 拓扑与关闭传播
// ============================================================================

/// splatter -> gather -> collect 的管道，关闭沿拓扑传到末端
#[tokio::test]
async fn test_pipeline_shutdown_propagation() {
    let specs = vec![
        RouteSpec::splatter("source", ["xs", "ys"]),
        RouteSpec::gather(["xs", "ys"], "zipped"),
        RouteSpec::collect(
            "zipped",
            "total",
            |acc: Value, pair: Value| -> anyhow::Result<Value> {
                let sum: i64 = pair
                    .as_array()
                    .map(|items| items.iter().filter_map(Value::as_i64).sum())
                    .unwrap_or(0);
                Ok(json!(acc.as_i64().unwrap_or(0) + sum))
            },
            json!(0),
        ),
    ];
    let registry = topology(&specs, &["source"]);
    let handles: Vec<_> = specs
        .into_iter()
        .map(|spec| dispatch(spec, &registry).unwrap())
        .collect();

    feed(
        channel(&registry, "source"),
        (0..5).map(|i| json!([i, i * 10])).collect(),
    );

    assert_eq!(drain(&channel(&registry, "total")).await, vec![json!(110)]);
    for handle in handles {
        handle.join().await.unwrap();
    }
    for alias in ["xs", "ys", "zipped", "total"] {
        assert!(channel(&registry, alias).is_closed(), "{alias} 应已关闭");
    }
}

/// 输出被他方提前关闭时，值被丢弃并计数，路由照常收尾
#[tokio::test]
async fn test_send_to_closed_output_is_dropped() {
    let spec = RouteSpec::scatter("a", ["open", "gone"]);
    let registry = topology(std::slice::from_ref(&spec), &["a"]);
    channel(&registry, "gone").close();
    let handle = dispatch(spec, &registry).unwrap();

    feed(channel(&registry, "a"), ints(0..3));
    assert_eq!(drain(&channel(&registry, "open")).await, ints(0..3));

    let exit = handle.join().await.unwrap();
    assert_eq!(exit.stats.sent, 3);
    assert_eq!(exit.stats.dropped, 3);
}

/// 未注册的别名在 dispatch 时同步报错
#[tokio::test]
async fn test_unknown_alias_rejected_at_dispatch() {
    let registry = topology(&[], &["p", "out"]);
    let err = dispatch(RouteSpec::union(["p", "nowhere"], "out"), &registry).unwrap_err();

    assert!(err.is_configuration_error());
    assert_eq!(err.error_code(), error_code::CHANNEL_NOT_FOUND);
    assert!(matches!(err, CoreError::ChannelNotFound(ref alias) if alias == "nowhere"));
}

/// 没有输入的 gather 是无效规格
#[tokio::test]
async fn test_gather_without_inputs_rejected() {
    let registry = topology(&[], &["out"]);
    let err = dispatch(RouteSpec::gather(Vec::<String>::new(), "out"), &registry).unwrap_err();
    assert_eq!(err.error_code(), error_code::ROUTE_INVALID_SPEC);
}
