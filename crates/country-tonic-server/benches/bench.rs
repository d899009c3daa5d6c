//! End-to-end `CreateCountry` throughput against a locally spawned server.
//!
//! Requires a MongoDB instance reachable at the server's default
//! `MONGODB_URI` (or whatever `.env` provides). Every iteration inserts real
//! documents into the configured collection.

use core::{fmt, hint::black_box};
use country_tonic_core::proto::{
    Country, CreateCountryRequest, country_service_client::CountryServiceClient,
};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::{StreamExt, stream::FuturesUnordered};
use std::{
    net::TcpStream,
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};
use tokio::runtime::Builder;
use tonic::{
    codec::CompressionEncoding,
    transport::{Channel, Uri},
};

#[derive(Clone, Copy, Debug)]
enum Compression {
    None,
    Deflate,
    Gzip,
    Zstd,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Deflate => write!(f, "deflate"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

impl From<Compression> for Option<CompressionEncoding> {
    fn from(value: Compression) -> Self {
        match value {
            Compression::None => None,
            Compression::Deflate => Some(CompressionEncoding::Deflate),
            Compression::Gzip => Some(CompressionEncoding::Gzip),
            Compression::Zstd => Some(CompressionEncoding::Zstd),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct GrpcBenchParams {
    concurrency: usize,
    compression: Compression,
}

fn grpc_bench(c: &mut Criterion) {
    let uri = Uri::try_from("http://127.0.0.1:50051").expect("Invalid URI");
    // Start the server. This may require a full compilation so set the timeout
    // high.
    let mut server = Command::new("cargo")
        .args([
            "run",
            "--bin",
            "country-tonic-server",
            "--release",
            "--",
            "--collection",
            "country_bench",
        ])
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("Failed to start country-tonic-server");
    wait_for_port(uri.authority().expect("missing authority").as_str(), 300);

    let concurrency_cases = [1, 8, 32, 128];
    let compression_cases = [Compression::None, Compression::Zstd, Compression::Gzip];

    let rt = Builder::new_multi_thread().enable_all().build().unwrap();

    for &concurrency in &concurrency_cases {
        for &compression in &compression_cases {
            let params = GrpcBenchParams {
                concurrency,
                compression,
            };
            let mut group = c.benchmark_group("grpc/create_country");
            group.throughput(Throughput::Elements(params.concurrency as u64));

            group.bench_function(
                format!("conc/{}/comp/{}", params.concurrency, params.compression),
                |b| {
                    b.to_async(&rt).iter_custom(|iters| {
                        let uri = uri.clone();
                        async move {
                            let channel = Channel::builder(uri)
                                .connect()
                                .await
                                .expect("Failed to connect to server");

                            let start = Instant::now();
                            for _ in 0..iters {
                                run_create_bench(&channel, params).await;
                            }
                            start.elapsed()
                        }
                    });
                },
            );

            group.finish();
        }
    }

    if server.kill().is_err() {
        eprintln!("failed to kill server");
    }
}

async fn run_create_bench(channel: &Channel, params: GrpcBenchParams) {
    let mut tasks = FuturesUnordered::new();

    for i in 0..params.concurrency {
        let channel = channel.clone();

        tasks.push(tokio::spawn(async move {
            let mut client = CountryServiceClient::new(channel);
            if let Some(encoding) = params.compression.into() {
                client = client.accept_compressed(encoding).send_compressed(encoding)
            }

            let created = client
                .create_country(CreateCountryRequest {
                    country: Some(Country {
                        id: String::new(),
                        code: format!("B{i}"),
                        name: "Benchland".to_string(),
                        region: "Bench".to_string(),
                        sub_region: "Criterion".to_string(),
                    }),
                })
                .await
                .expect("create call failed")
                .into_inner();

            black_box(created.country.expect("missing country").id);
        }));
    }

    while let Some(res) = tasks.next().await {
        res.unwrap();
    }
}

pub fn wait_for_port(addr: &str, timeout_secs: u64) {
    let start = Instant::now();
    while start.elapsed().as_secs() < timeout_secs {
        if TcpStream::connect(addr).is_ok() {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("Server did not start listening on {}", addr);
}

criterion_group!(grpc_benches, grpc_bench);
criterion_main!(grpc_benches);
