//! End-to-end tests against an in-process hub: a fresh `TcpListener` bound
//! to an ephemeral port, a handful of node connections, and the collective
//! engine running over the real wire protocol rather than mocked sockets.

use std::sync::Arc;

use hypermesh::{collective, Hub, Node};
use tokio::net::TcpListener;
use tokio::time::{timeout, Duration};

async fn start_hub(expected_nodes: i64) -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind ephemeral port");
    let port = listener.local_addr().expect("local_addr").port();
    let hub = Hub::new(expected_nodes);
    tokio::spawn(async move {
        let _ = hub.run_on(listener).await;
    });
    port
}

async fn connect_cohort(port: u16, n: i64) -> Vec<Arc<Node>> {
    let mut joins = Vec::new();
    for id in 0..n {
        joins.push(tokio::spawn(async move {
            Node::connect("127.0.0.1", port, id).await.expect("node connect")
        }));
    }
    let mut nodes = Vec::new();
    for join in joins {
        nodes.push(join.await.expect("node task panicked"));
    }
    nodes
}

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test(flavor = "multi_thread")]
async fn point_to_point_send_and_recv() {
    let port = start_hub(2).await;
    let nodes = connect_cohort(port, 2).await;

    nodes[0].send(1, &"hello from zero".to_string(), 9).expect("send");
    let received: String = timeout(TEST_TIMEOUT, nodes[1].recv_as(Some(0)))
        .await
        .expect("recv timed out")
        .expect("decode payload");
    assert_eq!(received, "hello from zero");
}

#[tokio::test(flavor = "multi_thread")]
async fn reduce_to_a_nonzero_root_multiplies_in_id_order() {
    let port = start_hub(4).await;
    let nodes = connect_cohort(port, 4).await;

    let joins: Vec<_> = nodes
        .into_iter()
        .map(|node| {
            tokio::spawn(async move {
                let value = node.id() + 1;
                collective::reduce(&node, 3, value, |a: i64, b: i64| a * b).await
            })
        })
        .collect();

    let mut results = Vec::new();
    for join in joins {
        results.push(timeout(TEST_TIMEOUT, join).await.expect("timed out").expect("task panicked").expect("reduce failed"));
    }
    // Only node 3 (the root) is guaranteed a meaningful accumulator.
    assert_eq!(results[3], 24);
}

#[tokio::test(flavor = "multi_thread")]
async fn reduce_to_root_zero_sums_node_ids() {
    let port = start_hub(4).await;
    let nodes = connect_cohort(port, 4).await;

    let joins: Vec<_> = nodes
        .into_iter()
        .map(|node| tokio::spawn(async move { collective::reduce(&node, 0, node.id(), |a: i64, b: i64| a + b).await }))
        .collect();

    let mut results = Vec::new();
    for join in joins {
        results.push(timeout(TEST_TIMEOUT, join).await.expect("timed out").expect("task panicked").expect("reduce failed"));
    }
    assert_eq!(results[0], 6);
}

#[tokio::test(flavor = "multi_thread")]
async fn broadcast_from_a_nonzero_root_reaches_every_node() {
    let port = start_hub(8).await;
    let nodes = connect_cohort(port, 8).await;

    let joins: Vec<_> = nodes
        .into_iter()
        .map(|node| {
            tokio::spawn(async move {
                let seeded = if node.id() == 7 { Some(42i64) } else { None };
                collective::broadcast(&node, 7, seeded).await
            })
        })
        .collect();

    for join in joins {
        let value = timeout(TEST_TIMEOUT, join).await.expect("timed out").expect("task panicked").expect("broadcast failed");
        assert_eq!(value, 42);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn scatter_from_a_nonzero_source_splits_contiguous_ranges() {
    let port = start_hub(4).await;
    let nodes = connect_cohort(port, 4).await;

    let full_list: Vec<i64> = vec![0, 1, 10, 11, 20, 21, 30, 31];
    let joins: Vec<_> = nodes
        .into_iter()
        .map(|node| {
            let full_list = full_list.clone();
            tokio::spawn(async move {
                let list = if node.id() == 2 { Some(full_list) } else { None };
                collective::scatter(&node, 2, list).await
            })
        })
        .collect();

    let mut results = Vec::new();
    for join in joins {
        results.push(timeout(TEST_TIMEOUT, join).await.expect("timed out").expect("task panicked").expect("scatter failed"));
    }
    assert_eq!(results[0], vec![0, 1]);
    assert_eq!(results[1], vec![10, 11]);
    assert_eq!(results[2], vec![20, 21]);
    assert_eq!(results[3], vec![30, 31]);
}

#[tokio::test(flavor = "multi_thread")]
async fn gather_to_a_nonzero_root_assembles_in_id_order() {
    let port = start_hub(4).await;
    let nodes = connect_cohort(port, 4).await;

    let joins: Vec<_> = nodes
        .into_iter()
        .map(|node| {
            tokio::spawn(async move {
                let id = node.id();
                collective::gather(&node, 1, vec![id, -id]).await
            })
        })
        .collect();

    let mut results = Vec::new();
    for join in joins {
        results.push(timeout(TEST_TIMEOUT, join).await.expect("timed out").expect("task panicked").expect("gather failed"));
    }
    assert_eq!(results[1], vec![0, 0, 1, -1, 2, -2, 3, -3]);
}

#[tokio::test(flavor = "multi_thread")]
async fn application_barrier_releases_all_nodes_together() {
    let port = start_hub(2).await;
    let nodes = connect_cohort(port, 2).await;

    let joins: Vec<_> = nodes.into_iter().map(|node| tokio::spawn(async move { node.barrier(1).await })).collect();

    for join in joins {
        timeout(TEST_TIMEOUT, join).await.expect("barrier never released").expect("task panicked").expect("barrier failed");
    }
}
