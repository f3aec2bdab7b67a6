//! Many requests in flight against one snapshot.

use futures_util::future::join_all;

mod common;

use common::{start_echo_upstream, start_proxy};

const REQUESTS: usize = 32;

fn body(i: usize) -> String {
    format!("<Item><Brand code=\"C{i}\">brand {i}</Brand></Item>")
}

#[tokio::test]
async fn test_concurrent_requests_match_serial_runs() {
    let upstream = start_echo_upstream().await;
    let proxy = start_proxy(
        upstream,
        &["attribute_plugin", "trace_plugin"],
        Some("[attribute]\nBrand@seen=yes\n\n[trace]\nlabel=t\n"),
    )
    .await;

    let mut serial = Vec::with_capacity(REQUESTS);
    for i in 0..REQUESTS {
        serial.push(proxy.post("/items", &body(i)).await.text().await.unwrap());
    }

    let concurrent = join_all((0..REQUESTS).map(|i| {
        let client = proxy.client.clone();
        let url = proxy.url("/items");
        async move {
            client
                .post(url)
                .body(body(i))
                .send()
                .await
                .unwrap()
                .text()
                .await
                .unwrap()
        }
    }))
    .await;

    for (i, (serial, concurrent)) in serial.iter().zip(&concurrent).enumerate() {
        assert_eq!(serial, concurrent, "request {} diverged", i);
        assert!(concurrent.contains(&format!("brand {i}")));
        assert!(concurrent.contains("seen"));
    }
}

#[tokio::test]
async fn test_reload_during_traffic_never_mixes_snapshots() {
    let upstream = start_echo_upstream().await;
    let proxy = start_proxy(upstream, &["custom_plugin"], Some("[custom]\ntext=OLD\n")).await;

    let traffic = join_all((0..REQUESTS).map(|i| {
        let client = proxy.client.clone();
        let url = proxy.url("/items");
        async move {
            client
                .post(url)
                .body(body(i))
                .send()
                .await
                .unwrap()
                .text()
                .await
                .unwrap()
        }
    }));
    let reload = proxy
        .client
        .post(proxy.url("/config"))
        .body("[custom]\ntext=NEW\n")
        .send();

    let (replies, reload) = tokio::join!(traffic, reload);
    assert!(reload.unwrap().status().is_success());
    for reply in replies {
        assert!(reply == "OLD" || reply == "NEW", "unexpected reply {reply}");
    }
    assert_eq!(proxy.post("/items", &body(0)).await.text().await.unwrap(), "NEW");
}
