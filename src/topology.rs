//! Network topology expansion: zones, subnets, routing, egress paths.
//!
//! Given an availability-zone count `N`, the builder expands a fixed
//! `10.0.0.0/16` boundary into `N` public/private subnet pairs with
//! per-zone NAT egress and one shared internet-gateway ingress path. Zone
//! expansion is a pure function of the zone index, so the public and
//! private subnet sequences are index-aligned by construction rather than
//! by convention.

use thiserror::Error;
use tracing::debug;

use crate::naming::Namer;
use crate::plan::{Declaration, Plan, PlanError, Reference, ResourceKind, Value};

/// CIDR block assigned to the network boundary.
pub const BOUNDARY_CIDR: &str = "10.0.0.0/16";

/// Third octet of zone 0's public subnet; zone `i` uses `BASE + i`.
const PUBLIC_OCTET_BASE: u8 = 1;

/// Third octet of zone 0's private subnet. The offset of 4 keeps private
/// ranges clear of public ones only while `az_count <= 3`.
const PRIVATE_OCTET_BASE: u8 = 4;

/// Hard ceiling on the zone count before public and private third-octet
/// ranges would collide.
pub const MAX_ZONES: u8 = PRIVATE_OCTET_BASE - PUBLIC_OCTET_BASE;

/// Inputs to the topology builder.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TopologyRequest {
    /// Base region locator; zone letters are suffixed onto it.
    pub region: String,
    /// Number of independently NAT-isolated zones to build.
    pub az_count: u8,
    /// Zone availability reported by the provider for this region, when the
    /// caller has it. Absent a value, the provisioning runtime is the
    /// authority at create time.
    pub zones_available: Option<u8>,
}

impl TopologyRequest {
    /// Creates a request, trimming the region locator.
    #[must_use]
    pub fn new(region: impl Into<String>, az_count: u8) -> Self {
        Self {
            region: region.into().trim().to_owned(),
            az_count,
            zones_available: None,
        }
    }

    /// Caps the zone count by the provider's reported availability.
    #[must_use]
    pub const fn zones_available(mut self, value: Option<u8>) -> Self {
        self.zones_available = value;
        self
    }

    /// Validates the request before any resource is declared.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError`] when the region is empty, the zone count is
    /// zero, or the count exceeds the CIDR budget or provider availability.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.region.is_empty() {
            return Err(TopologyError::EmptyRegion);
        }
        if self.az_count == 0 {
            return Err(TopologyError::NoZones);
        }
        if self.az_count > MAX_ZONES {
            return Err(TopologyError::ZoneBudget {
                requested: self.az_count,
            });
        }
        if let Some(available) = self.zones_available
            && self.az_count > available
        {
            return Err(TopologyError::ZonesUnavailable {
                requested: self.az_count,
                available,
            });
        }
        Ok(())
    }
}

/// Errors raised while validating or expanding the topology.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TopologyError {
    /// Raised when the region locator is empty.
    #[error("region must not be empty")]
    EmptyRegion,
    /// Raised when no zones are requested; an edge layer with zero subnets
    /// is invalid, so the builder fails fast instead of emitting degenerate
    /// resources.
    #[error("az_count must be at least 1")]
    NoZones,
    /// Raised when the zone count would make public and private subnet
    /// ranges overlap.
    #[error("az_count {requested} exceeds the CIDR budget of {MAX_ZONES} zones")]
    ZoneBudget {
        /// Requested zone count.
        requested: u8,
    },
    /// Raised when the zone count exceeds the provider's reported
    /// availability for the region.
    #[error("az_count {requested} exceeds the {available} zones available in this region")]
    ZonesUnavailable {
        /// Requested zone count.
        requested: u8,
        /// Zones the provider reports for the region.
        available: u8,
    },
    /// Raised when a declaration cannot be pushed into the plan.
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// References into the declared network, consumed by downstream builders.
///
/// The two subnet sequences always have equal length `az_count` and are
/// index-aligned: index `i` in both refers to the same logical zone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkTopology {
    /// Network boundary identifier.
    pub vpc: Reference,
    /// Public subnet identifiers in zone-index order.
    pub public_subnets: Vec<Reference>,
    /// Private subnet identifiers in zone-index order.
    pub private_subnets: Vec<Reference>,
}

/// Names of the shared (non-zonal) network resources, threaded into the
/// per-zone expansion.
struct SharedNetwork {
    vpc: String,
    gateway: String,
    ingress_table: String,
}

/// Declarations and subnet references produced for one zone.
struct ZoneResources {
    declarations: Vec<Declaration>,
    public_subnet: Reference,
    private_subnet: Reference,
}

/// Declares the network boundary, ingress path, and one egress path per
/// zone, returning the subnet reference sequences consumed by the edge and
/// workload layers.
///
/// # Errors
///
/// Returns [`TopologyError`] when validation fails or a declaration cannot
/// be pushed into the plan. Validation runs before anything is declared.
pub fn build_network(
    plan: &mut Plan,
    namer: &Namer,
    request: &TopologyRequest,
) -> Result<NetworkTopology, TopologyError> {
    request.validate()?;

    let vpc_name = namer.name("vpc");
    plan.declare(
        Declaration::new(&vpc_name, ResourceKind::Vpc)
            .property("cidr_block", BOUNDARY_CIDR)
            .property("enable_dns_hostnames", true)
            .property("enable_dns_support", true)
            .tags(namer.tags(&vpc_name)),
    )?;

    let gateway_name = namer.name("internet-gateway");
    plan.declare(
        Declaration::new(&gateway_name, ResourceKind::InternetGateway)
            .property("vpc_id", Reference::id(&vpc_name))
            .tags(namer.tags(&gateway_name)),
    )?;

    let ingress_table_name = namer.name("public-rt");
    plan.declare(
        Declaration::new(&ingress_table_name, ResourceKind::RouteTable)
            .property("vpc_id", Reference::id(&vpc_name))
            .property(
                "routes",
                Value::List(vec![route("gateway_id", Reference::id(&gateway_name))]),
            )
            .tags(namer.tags(&ingress_table_name)),
    )?;

    let shared = SharedNetwork {
        vpc: vpc_name.clone(),
        gateway: gateway_name,
        ingress_table: ingress_table_name,
    };

    let zones: Vec<ZoneResources> = (0..request.az_count)
        .map(|index| zone_resources(namer, &request.region, &shared, index))
        .collect();

    let mut public_subnets = Vec::with_capacity(zones.len());
    let mut private_subnets = Vec::with_capacity(zones.len());
    for zone in zones {
        for declaration in zone.declarations {
            plan.declare(declaration)?;
        }
        public_subnets.push(zone.public_subnet);
        private_subnets.push(zone.private_subnet);
    }

    Ok(NetworkTopology {
        vpc: Reference::id(vpc_name),
        public_subnets,
        private_subnets,
    })
}

/// Pure expansion of one zone: subnet pair, egress path, associations.
fn zone_resources(
    namer: &Namer,
    region: &str,
    shared: &SharedNetwork,
    index: u8,
) -> ZoneResources {
    let locator = zone_locator(region, index);
    debug!(zone = %locator, "expanding zone resources");

    let public_name = namer.zone_name("public-subnet", index);
    let private_name = namer.zone_name("private-subnet", index);
    let eip_name = namer.zone_name("eip", index);
    let nat_name = namer.zone_name("nat-gateway", index);
    let egress_table_name = namer.zone_name("private-rt", index);
    let egress_assoc_name = namer.zone_name("private-rt-assoc", index);
    let ingress_assoc_name = namer.zone_name("public-rt-assoc", index);

    let declarations = vec![
        Declaration::new(&public_name, ResourceKind::Subnet)
            .property("vpc_id", Reference::id(&shared.vpc))
            .property("cidr_block", public_cidr(index))
            .property("availability_zone", locator.clone())
            .property("map_public_ip_on_launch", true)
            .tags(namer.tags(&public_name)),
        Declaration::new(&private_name, ResourceKind::Subnet)
            .property("vpc_id", Reference::id(&shared.vpc))
            .property("cidr_block", private_cidr(index))
            .property("availability_zone", locator)
            .property("map_public_ip_on_launch", false)
            .tags(namer.tags(&private_name)),
        Declaration::new(&eip_name, ResourceKind::ElasticIp)
            .property("domain", "vpc")
            .tags(namer.tags(&eip_name)),
        // The NAT gateway is anchored in this zone's public subnet and is
        // never shared with another zone.
        Declaration::new(&nat_name, ResourceKind::NatGateway)
            .property("subnet_id", Reference::id(&public_name))
            .property("allocation_id", Reference::id(&eip_name))
            .requires(&shared.gateway)
            .tags(namer.tags(&nat_name)),
        Declaration::new(&egress_table_name, ResourceKind::RouteTable)
            .property("vpc_id", Reference::id(&shared.vpc))
            .property(
                "routes",
                Value::List(vec![route("nat_gateway_id", Reference::id(&nat_name))]),
            )
            .tags(namer.tags(&egress_table_name)),
        Declaration::new(&egress_assoc_name, ResourceKind::RouteTableAssociation)
            .property("subnet_id", Reference::id(&private_name))
            .property("route_table_id", Reference::id(&egress_table_name)),
        Declaration::new(&ingress_assoc_name, ResourceKind::RouteTableAssociation)
            .property("subnet_id", Reference::id(&public_name))
            .property("route_table_id", Reference::id(&shared.ingress_table)),
    ];

    ZoneResources {
        declarations,
        public_subnet: Reference::id(public_name),
        private_subnet: Reference::id(private_name),
    }
}

/// Builds a default route (`0.0.0.0/0`) targeting the given gateway
/// attribute.
fn route(target_key: &str, target: Reference) -> Value {
    Value::Map(std::collections::BTreeMap::from([
        (String::from("cidr_block"), Value::str("0.0.0.0/0")),
        (target_key.to_owned(), Value::Ref(target)),
    ]))
}

/// Derives the zone locator for zone `index` (`region` + letter suffix).
fn zone_locator(region: &str, index: u8) -> String {
    format!("{region}{}", char::from(b'a' + index))
}

/// CIDR slice assigned to zone `index`'s public subnet.
fn public_cidr(index: u8) -> String {
    format!("10.0.{}.0/24", PUBLIC_OCTET_BASE + index)
}

/// CIDR slice assigned to zone `index`'s private subnet.
fn private_cidr(index: u8) -> String {
    format!("10.0.{}.0/24", PRIVATE_OCTET_BASE + index)
}
