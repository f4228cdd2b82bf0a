//! Simulation scenarios
//!
//! The Sun-Earth-Moon system is always present. A scenario adds the ground
//! segment, spacecraft, Earth-Moon Lagrange repeaters and the traffic to
//! exchange each step. Fields missing from a scenario file fall back to the
//! built-in Earth-Moon scenario.

use anyhow::{bail, Context, Result};
use orbital_mechanics::transforms::{geodetic_to_cartesian, horizon_basis};
use orbital_mechanics::{
    BodyId, BodySpec, EarthRotation, Elements, Ellipsoid, Ephemeris, Epoch, LagrangeEphemeris, LagrangePoint,
    Orbit, Size, World,
};
use relay_network::{MessageKind, Mount, NodeId, NodeRole, NodeSpec, RelayConfig, RelayNetwork, View};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const SUN_MASS: f64 = 1.9885e30;
const EARTH_MASS: f64 = 5.9722e24;
const MOON_MASS: f64 = 7.342e22;

/// Reach of antennas that do not configure their own view.
const DEFAULT_RANGE_M: f64 = 1.0e9;
const DEFAULT_SPACECRAFT_HALF_ANGLE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralBody {
    Earth,
    Moon,
}

/// Orbital elements in meters and degrees; exactly one size must be given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub eccentricity: f64,
    pub semimajor_axis_m: Option<f64>,
    pub perifocus_m: Option<f64>,
    pub inclination_deg: f64,
    pub ascending_node_deg: f64,
    pub periapsis_argument_deg: f64,
    pub true_anomaly_deg: f64,
}

impl OrbitConfig {
    fn elements(&self, epoch: Epoch) -> Result<Elements> {
        let size = match (self.semimajor_axis_m, self.perifocus_m) {
            (Some(a), None) => Size::SemimajorAxis(a),
            (None, Some(q)) => Size::Perifocus(q),
            _ => bail!("orbit needs exactly one of semimajor_axis_m and perifocus_m"),
        };
        Ok(Elements {
            epoch,
            eccentricity: self.eccentricity,
            size,
            inclination: self.inclination_deg.to_radians(),
            ascending_node: self.ascending_node_deg.to_radians(),
            periapsis_argument: self.periapsis_argument_deg.to_radians(),
            true_anomaly: self.true_anomaly_deg.to_radians(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundStationConfig {
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Must be above the ellipsoid so the surface never occludes the site.
    pub altitude_m: f64,
    #[serde(default)]
    pub view: Option<View>,
    #[serde(default)]
    pub analysis_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacecraftConfig {
    pub name: String,
    pub role: NodeRole,
    pub central: CentralBody,
    /// Elements at the simulation start epoch.
    pub orbit: OrbitConfig,
    #[serde(default)]
    pub view: Option<View>,
    #[serde(default)]
    pub analysis_ms: u64,
}

/// A repeater parked at an Earth-Moon Lagrange point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagrangeRepeaterConfig {
    pub name: String,
    pub point: LagrangePoint,
    #[serde(default)]
    pub view: Option<View>,
    #[serde(default)]
    pub analysis_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficConfig {
    pub from: String,
    pub to: String,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub relay: RelayConfig,
    pub ground_stations: Vec<GroundStationConfig>,
    pub spacecraft: Vec<SpacecraftConfig>,
    pub lagrange_repeaters: Vec<LagrangeRepeaterConfig>,
    pub traffic: Vec<TrafficConfig>,
}

/// Resolved traffic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Traffic {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: MessageKind,
}

pub struct Simulation {
    pub network: Arc<RelayNetwork>,
    pub traffic: Vec<Traffic>,
    pub bodies: SolarSystem,
}

#[derive(Debug, Clone)]
pub struct SolarSystem {
    pub sun: BodyId,
    pub earth: BodyId,
    /// Rotating, shaped Earth carrying the ground sites.
    pub earth_fixed: BodyId,
    pub moon: BodyId,
    pub earth_shape: Ellipsoid,
    moon_orbit: Arc<Orbit>,
}

impl SolarSystem {
    /// Sun at the origin, Earth on a heliocentric orbit and the Moon on a
    /// geocentric one. Mean elements at J2000, referred to the ecliptic.
    pub fn build(world: &mut World) -> Result<Self> {
        let sun = world.add_body(
            BodySpec::new("Sun")
                .mass(SUN_MASS)
                .shape(Ellipsoid::new(6.955e8, 6.9551e8)?),
        )?;

        let earth_orbit = Orbit::new(
            Elements {
                epoch: Epoch::j2000(),
                eccentricity: 0.016_708_6,
                size: Size::SemimajorAxis(1.495_978_707e11),
                inclination: 0.0,
                ascending_node: 0.0,
                periapsis_argument: 102.937_f64.to_radians(),
                true_anomaly: (-2.553_f64).to_radians(),
            },
            world.body(sun)?,
        )?;
        let earth = world.add_body(
            BodySpec::new("Earth")
                .parent(sun)
                .mass(EARTH_MASS)
                .ephemeris(Arc::new(earth_orbit)),
        )?;

        let earth_shape = Ellipsoid::new(6.3568e6, 6.3781e6)?;
        let earth_fixed = world.add_body(
            BodySpec::new("Earth (fixed)")
                .parent(earth)
                .shape(earth_shape)
                .ephemeris(Arc::new(EarthRotation::default())),
        )?;

        let moon_orbit = Arc::new(Orbit::new(
            Elements {
                epoch: Epoch::j2000(),
                eccentricity: 0.0549,
                size: Size::SemimajorAxis(3.843_99e8),
                inclination: 5.145_f64.to_radians(),
                ascending_node: 125.08_f64.to_radians(),
                periapsis_argument: 318.15_f64.to_radians(),
                true_anomaly: 139.4_f64.to_radians(),
            },
            world.body(earth)?,
        )?);
        let moon = world.add_body(
            BodySpec::new("Moon")
                .parent(earth)
                .mass(MOON_MASS)
                .shape(Ellipsoid::new(1.7371e6, 1.73814e6)?)
                .ephemeris(moon_orbit.clone()),
        )?;

        Ok(Self {
            sun,
            earth,
            earth_fixed,
            moon,
            earth_shape,
            moon_orbit,
        })
    }

    fn central(&self, central: CentralBody) -> BodyId {
        match central {
            CentralBody::Earth => self.earth,
            CentralBody::Moon => self.moon,
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening scenario {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing scenario {}", path.display()))
    }

    /// Build the world and network, placing every body at `start`.
    pub fn build(&self, start: Epoch) -> Result<Simulation> {
        let mut builder = RelayNetwork::builder(World::new(start), self.relay.clone());
        let bodies = SolarSystem::build(builder.world_mut())?;

        for station in &self.ground_stations {
            if !(station.altitude_m > 0.0) {
                bail!("ground station {} must sit above the surface", station.name);
            }
            if !(-90.0..=90.0).contains(&station.latitude_deg) || !(-180.0..=360.0).contains(&station.longitude_deg) {
                bail!("ground station {} has invalid coordinates", station.name);
            }
            let position = geodetic_to_cartesian(
                station.latitude_deg,
                station.longitude_deg,
                station.altitude_m,
                &bodies.earth_shape,
            );
            let site = builder.world_mut().add_body(
                BodySpec::new(format!("{} site", station.name))
                    .parent(bodies.earth_fixed)
                    .at(position)
                    .basis(horizon_basis(station.latitude_deg, station.longitude_deg)),
            )?;
            let view = match station.view {
                Some(view) => view,
                None => View::conic(DEFAULT_RANGE_M, FRAC_PI_2)?,
            };
            builder.add_node(
                NodeSpec::ground_station(station.name.as_str(), site, view)
                    .analysis_time(Duration::from_millis(station.analysis_ms)),
            )?;
        }

        for craft in &self.spacecraft {
            if craft.role == NodeRole::GroundStation {
                bail!("spacecraft {} cannot have the ground station role", craft.name);
            }
            let central = bodies.central(craft.central);
            let elements = craft
                .orbit
                .elements(start)
                .with_context(|| format!("orbit of {}", craft.name))?;
            let orbit = Orbit::new(elements, builder.world().body(central)?)
                .with_context(|| format!("orbit of {}", craft.name))?;
            let carrier = builder.world_mut().add_body(
                BodySpec::new(craft.name.as_str())
                    .parent(central)
                    .ephemeris(Arc::new(orbit)),
            )?;
            builder.add_node(
                NodeSpec::new(
                    craft.name.as_str(),
                    craft.role,
                    Mount::Carried { carrier },
                    spacecraft_view(craft.view)?,
                )
                .analysis_time(Duration::from_millis(craft.analysis_ms)),
            )?;
        }

        for repeater in &self.lagrange_repeaters {
            let moon: Arc<dyn Ephemeris> = bodies.moon_orbit.clone();
            let ephemeris = LagrangeEphemeris::new(repeater.point, moon, EARTH_MASS, MOON_MASS)?;
            let carrier = builder.world_mut().add_body(
                BodySpec::new(repeater.name.as_str())
                    .parent(bodies.earth)
                    .ephemeris(Arc::new(ephemeris)),
            )?;
            builder.add_node(
                NodeSpec::repeater(repeater.name.as_str(), carrier, spacecraft_view(repeater.view)?)
                    .analysis_time(Duration::from_millis(repeater.analysis_ms)),
            )?;
        }

        let network = builder.build();
        network.propagate_all(start)?;

        let traffic = self
            .traffic
            .iter()
            .map(|t| {
                Ok(Traffic {
                    from: resolve(&network, &t.from)?,
                    to: resolve(&network, &t.to)?,
                    kind: t.kind,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            scenario = %self.name,
            nodes = network.nodes().len(),
            traffic = traffic.len(),
            %start,
            "scenario built"
        );
        Ok(Simulation {
            network,
            traffic,
            bodies,
        })
    }
}

fn spacecraft_view(view: Option<View>) -> Result<View> {
    Ok(match view {
        Some(view) => view,
        None => View::conic(DEFAULT_RANGE_M, DEFAULT_SPACECRAFT_HALF_ANGLE)?,
    })
}

fn resolve(network: &RelayNetwork, name: &str) -> Result<NodeId> {
    network
        .node_by_name(name)
        .map(|node| node.id())
        .with_context(|| format!("traffic refers to unknown node {name}"))
}

impl Default for Scenario {
    /// Deep Space Network stations talking to a low lunar orbiter through an
    /// equatorial Earth relay and two Earth-Moon Lagrange relays.
    fn default() -> Self {
        let station = |name: &str, latitude_deg: f64, longitude_deg: f64, altitude_m: f64| GroundStationConfig {
            name: name.to_string(),
            latitude_deg,
            longitude_deg,
            altitude_m,
            view: None,
            analysis_ms: 200,
        };
        let lagrange = |name: &str, point: LagrangePoint| LagrangeRepeaterConfig {
            name: name.to_string(),
            point,
            view: None,
            analysis_ms: 100,
        };
        let traffic = |from: &str, to: &str, kind: MessageKind| TrafficConfig {
            from: from.to_string(),
            to: to.to_string(),
            kind,
        };

        Self {
            name: "earth-moon".to_string(),
            relay: RelayConfig::default(),
            ground_stations: vec![
                station("Goldstone", 35.4267, -116.89, 1_000.0),
                station("Madrid", 40.4314, -4.2481, 830.0),
                station("Canberra", -35.4014, 148.9817, 680.0),
            ],
            spacecraft: vec![
                SpacecraftConfig {
                    name: "Lunar Orbiter".to_string(),
                    role: NodeRole::MainSpacecraft,
                    central: CentralBody::Moon,
                    orbit: OrbitConfig {
                        semimajor_axis_m: Some(1.8371e6),
                        inclination_deg: 90.0,
                        ..OrbitConfig::default()
                    },
                    view: None,
                    analysis_ms: 500,
                },
                SpacecraftConfig {
                    name: "Earth Relay".to_string(),
                    role: NodeRole::Repeater,
                    central: CentralBody::Earth,
                    // geostationary radius in the equatorial plane
                    orbit: OrbitConfig {
                        semimajor_axis_m: Some(4.2164e7),
                        inclination_deg: 23.439,
                        ascending_node_deg: 180.0,
                        ..OrbitConfig::default()
                    },
                    view: None,
                    analysis_ms: 100,
                },
            ],
            lagrange_repeaters: vec![
                lagrange("EML2 Relay", LagrangePoint::L2),
                lagrange("EML4 Relay", LagrangePoint::L4),
            ],
            traffic: vec![
                traffic("Goldstone", "Lunar Orbiter", MessageKind::Command),
                traffic("Lunar Orbiter", "Madrid", MessageKind::Telemetry),
                traffic("Canberra", "Lunar Orbiter", MessageKind::Payload),
            ],
        }
    }
}
