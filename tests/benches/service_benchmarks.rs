//! # Provider Node Benchmarks
//!
//! Hot paths a consumer burst exercises:
//!
//! | Component | Operation | Target |
//! |-----------|-----------|--------|
//! | pn-01 Port Pool | lease + release from a fixed range | < 10µs |
//! | pn-02 NAT Mapping | hook construction | < 1µs |
//! | pn-03 Dialog | allow-list validation | < 1µs |

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pn_01_port_pool::PortPool;
use pn_02_nat_mapping::{MappingBackend, MappingRequest, NatError, NatPortMapper};
use pn_03_dialog::{AllowListValidator, PeerValidator};
use shared_bus::InMemoryEventBus;
use shared_types::{Identity, PortRange, TransportProtocol};

struct NullBackend;

#[async_trait]
impl MappingBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn map(&self, _request: &MappingRequest) -> Result<(), NatError> {
        Ok(())
    }

    async fn unmap(&self, _request: &MappingRequest) -> Result<(), NatError> {
        Ok(())
    }
}

fn identity(n: u32) -> Identity {
    Identity::from_address(&format!("0x{:040x}", n))
}

// ============================================================================
// PN-01: Port Pool
// ============================================================================

fn bench_fixed_range_lease(c: &mut Criterion) {
    let mut group = c.benchmark_group("pn01_fixed_range_lease");
    for size in [10u16, 100, 1000] {
        let range = PortRange::new(20000, 20000 + size - 1).unwrap_or(PortRange {
            start: 20000,
            end: 20000,
        });
        let pool = PortPool::fixed_range(range);
        // Half the range is held so each lease scans past live allocations.
        let held: Vec<_> = (0..size / 2).filter_map(|_| pool.next().ok()).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |b, pool| {
            b.iter(|| {
                let lease = pool.next();
                black_box(lease.map(|l| l.port()).ok())
            });
        });
        drop(held);
    }
    group.finish();
}

// ============================================================================
// PN-02: NAT Mapping
// ============================================================================

fn bench_hook_build(c: &mut Criterion) {
    let mapper = NatPortMapper::new(
        IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1)),
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
        TransportProtocol::Udp,
        "Provider node WireGuard port mapping",
        Arc::new(NullBackend),
        Arc::new(InMemoryEventBus::new()),
    );
    c.bench_function("pn02_hook_build", |b| {
        b.iter(|| black_box(mapper.build(black_box(51000))));
    });
}

// ============================================================================
// PN-03: Allow-list validation
// ============================================================================

fn bench_allow_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("pn03_allow_list");
    for size in [1u32, 100, 10_000] {
        let validator = AllowListValidator::new((0..size).map(identity));
        let stranger = identity(size + 1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &validator, |b, v| {
            b.iter(|| black_box(v.validate(black_box(&stranger)).is_err()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fixed_range_lease, bench_hook_build, bench_allow_list);
criterion_main!(benches);
