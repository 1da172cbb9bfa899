use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::index;

use crate::error::SampleError;
use crate::pools::{AddressPool, block_size};

/// Draw `count` probe targets from `pool`.
///
/// CIDR pools are sampled with replacement, blocks weighted by size, so the
/// result always has `count` entries and may repeat. List pools are sampled
/// without replacement and yield `min(count, len)` entries; asking for the
/// whole list (or more) returns it in its original order.
pub fn sample<R: Rng + ?Sized>(
    pool: &AddressPool,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Ipv4Addr>, SampleError> {
    if count == 0 {
        return Err(SampleError::InvalidInput("count must be positive"));
    }
    match pool {
        AddressPool::Cidr(nets) => sample_cidrs(nets, count, rng),
        AddressPool::List(addrs) => Ok(sample_list(addrs, count, rng)),
    }
}

fn sample_cidrs<R: Rng + ?Sized>(
    nets: &[Ipv4Net],
    count: usize,
    rng: &mut R,
) -> Result<Vec<Ipv4Addr>, SampleError> {
    if nets.is_empty() {
        return Err(SampleError::InvalidInput("CIDR pool is empty"));
    }
    let weights = nets.iter().map(block_size);
    let dist = WeightedIndex::new(weights)
        .map_err(|_| SampleError::InvalidInput("CIDR pool has no addresses"))?;

    Ok((0..count)
        .map(|_| pick_in_block(&nets[dist.sample(rng)], rng))
        .collect())
}

/// Blocks of two or fewer addresses only ever yield the network address;
/// larger blocks skip network and broadcast.
fn pick_in_block<R: Rng + ?Sized>(net: &Ipv4Net, rng: &mut R) -> Ipv4Addr {
    let size = block_size(net);
    let offset = if size > 2 { rng.random_range(1..=size - 2) } else { 0 };
    let base = u64::from(u32::from(net.network()));
    Ipv4Addr::from((base + offset) as u32)
}

fn sample_list<R: Rng + ?Sized>(addrs: &[Ipv4Addr], count: usize, rng: &mut R) -> Vec<Ipv4Addr> {
    if count >= addrs.len() {
        return addrs.to_vec();
    }
    index::sample(rng, addrs.len(), count)
        .into_iter()
        .map(|i| addrs[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::{CLOUDFLARE_CIDRS, FASTLY_CIDRS};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn cidr_pool(cidrs: &[&str]) -> AddressPool {
        AddressPool::from_cidrs(cidrs).unwrap()
    }

    #[test]
    fn large_blocks_never_yield_network_or_broadcast() {
        let mut rng = StdRng::seed_from_u64(7);
        for cidr in ["192.168.1.0/30", "10.1.0.0/29", "172.16.0.0/24"] {
            let net: Ipv4Net = cidr.parse().unwrap();
            let pool = AddressPool::Cidr(vec![net]);
            for ip in sample(&pool, 500, &mut rng).unwrap() {
                assert!(net.contains(&ip), "{ip} outside {net}");
                assert_ne!(ip, net.network());
                assert_ne!(ip, net.broadcast());
            }
        }
    }

    #[test]
    fn slash_30_covers_both_hosts() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = cidr_pool(&["192.168.1.0/30"]);
        let seen: HashSet<_> = sample(&pool, 200, &mut rng).unwrap().into_iter().collect();
        let expected: HashSet<_> = [Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2)]
            .into_iter()
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn tiny_blocks_yield_network_address() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = cidr_pool(&["10.0.0.0/31"]);
        let ips = sample(&pool, 3, &mut rng).unwrap();
        assert_eq!(ips, vec![Ipv4Addr::new(10, 0, 0, 0); 3]);

        let pool = cidr_pool(&["10.9.9.9/32"]);
        let ips = sample(&pool, 4, &mut rng).unwrap();
        assert_eq!(ips, vec![Ipv4Addr::new(10, 9, 9, 9); 4]);
    }

    #[test]
    fn cidr_sampling_returns_exact_count() {
        let mut rng = StdRng::seed_from_u64(11);
        let pool = cidr_pool(FASTLY_CIDRS);
        for count in [1, 2, 17, 1000] {
            assert_eq!(sample(&pool, count, &mut rng).unwrap().len(), count);
        }
    }

    #[test]
    fn cidr_sampling_follows_block_weights() {
        let mut rng = StdRng::seed_from_u64(5);
        // /16 is 256x the /24
        let pool = cidr_pool(&["10.0.0.0/24", "172.16.0.0/16"]);
        let small: Ipv4Net = "10.0.0.0/24".parse().unwrap();
        let ips = sample(&pool, 10_000, &mut rng).unwrap();
        let in_small = ips.iter().filter(|ip| small.contains(*ip)).count();
        assert!(in_small < 200, "small block drawn {in_small} times");
    }

    #[test]
    fn every_sample_lands_in_its_pool() {
        let mut rng = StdRng::seed_from_u64(9);
        let pool = cidr_pool(CLOUDFLARE_CIDRS);
        let AddressPool::Cidr(nets) = &pool else { unreachable!() };
        for ip in sample(&pool, 2000, &mut rng).unwrap() {
            assert!(nets.iter().any(|n| n.contains(&ip)), "{ip} not in any block");
        }
    }

    #[test]
    fn list_smaller_than_count_returns_everything_in_order() {
        let mut rng = StdRng::seed_from_u64(0);
        let pool = AddressPool::from_strings(vec!["1.2.3.4".into(), "5.6.7.8".into()]);
        let ips = sample(&pool, 5, &mut rng).unwrap();
        assert_eq!(ips, vec![Ipv4Addr::new(1, 2, 3, 4), Ipv4Addr::new(5, 6, 7, 8)]);
    }

    #[test]
    fn list_sampling_is_distinct() {
        let mut rng = StdRng::seed_from_u64(21);
        let addrs: Vec<Ipv4Addr> = (1..=50).map(|i| Ipv4Addr::new(10, 0, 0, i)).collect();
        let pool = AddressPool::List(addrs.clone());
        let ips = sample(&pool, 20, &mut rng).unwrap();
        assert_eq!(ips.len(), 20);
        let unique: HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 20);
        assert!(ips.iter().all(|ip| addrs.contains(ip)));
    }

    #[test]
    fn empty_list_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        let pool = AddressPool::List(Vec::new());
        assert!(sample(&pool, 10, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn zero_count_and_empty_cidr_pool_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let pool = cidr_pool(FASTLY_CIDRS);
        assert!(matches!(sample(&pool, 0, &mut rng), Err(SampleError::InvalidInput(_))));
        let pool = AddressPool::List(vec![Ipv4Addr::LOCALHOST]);
        assert!(matches!(sample(&pool, 0, &mut rng), Err(SampleError::InvalidInput(_))));
        let pool = AddressPool::Cidr(Vec::new());
        assert!(matches!(sample(&pool, 3, &mut rng), Err(SampleError::InvalidInput(_))));
    }

    #[test]
    fn same_seed_same_output() {
        let cidr = cidr_pool(CLOUDFLARE_CIDRS);
        let list = AddressPool::List((0..=255).map(|i| Ipv4Addr::new(192, 0, 2, i)).collect());
        for pool in [cidr, list] {
            let a = sample(&pool, 64, &mut StdRng::seed_from_u64(42)).unwrap();
            let b = sample(&pool, 64, &mut StdRng::seed_from_u64(42)).unwrap();
            assert_eq!(a, b);
        }
    }
}
