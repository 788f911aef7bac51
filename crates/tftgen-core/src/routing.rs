//! Manhattan trace routing between ports.
//!
//! [`route_single`] draws one trace between two ports. [`route_channel`] wires
//! many nets through a two-layer channel: one horizontal track per net on the
//! horizontal layer and vertical drops on the other layer, with a via at
//! every layer change.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::align::Placeable;
use crate::cell::{Cell, CellInstance, Port};
use crate::cross_section::CrossSection;
use crate::error::{LayoutError, Result};
use crate::geometry::{GeomPrimitive, Path, Point, EPSILON};
use crate::LayerId;

/// A routed trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub path: Path,
}

impl Route {
    pub fn length(&self) -> f64 {
        self.path.length()
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.path.points
    }
}

fn dot(v: (f64, f64), d: (f64, f64)) -> f64 {
    v.0 * d.0 + v.1 * d.1
}

fn sub(a: Point, b: Point) -> (f64, f64) {
    (a.x - b.x, a.y - b.y)
}

fn step(p: Point, d: (f64, f64), k: f64) -> Point {
    Point::new(p.x + d.0 * k, p.y + d.1 * k)
}

/// Whether `to` lies strictly ahead of `from` along `dir`.
fn ahead(from: Point, dir: (f64, f64), to: Point) -> bool {
    dot(sub(to, from), dir) > EPSILON
}

fn check_layer(port: &Port, xs: &CrossSection) -> Result<()> {
    if port.layer != xs.layer {
        return Err(LayoutError::LayerMismatch {
            port: port.name.clone(),
            port_layer: port.layer,
            route_layer: xs.layer,
        });
    }
    // A trace wider than its port overhangs the metal it lands on.
    if xs.width > port.width + EPSILON {
        log::warn!(
            "port '{}' is {} wide, routing with {} ({})",
            port.name,
            port.width,
            xs.name,
            xs.width
        );
    }
    Ok(())
}

/// Drop repeated points and points in the middle of a straight run.
fn simplify(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_some_and(|last| last.approx_eq(&p)) {
            continue;
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let collinear = ((a.x - b.x).abs() < EPSILON && (b.x - p.x).abs() < EPSILON)
                || ((a.y - b.y).abs() < EPSILON && (b.y - p.y).abs() < EPSILON);
            if collinear {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

/// Centerline from `a` leaving along `d1` to `b`, entered against `d2`.
fn waypoints(a: Point, d1: (f64, f64), b: Point, d2: (f64, f64), ext: f64) -> Result<Vec<Point>> {
    let horizontal = d1.1 == 0.0;
    let facing = d1.0 == -d2.0 && d1.1 == -d2.1;
    let same = d1 == d2;
    let lateral = if horizontal { b.y - a.y } else { b.x - a.x };

    if facing && ahead(a, d1, b) {
        if lateral.abs() < EPSILON {
            return Ok(vec![a, b]);
        }
        let (p, q) = if horizontal {
            let mx = (a.x + b.x) / 2.0;
            (Point::new(mx, a.y), Point::new(mx, b.y))
        } else {
            let my = (a.y + b.y) / 2.0;
            (Point::new(a.x, my), Point::new(b.x, my))
        };
        return Ok(vec![a, p, q, b]);
    }

    if !facing && !same {
        let corner = if horizontal {
            Point::new(b.x, a.y)
        } else {
            Point::new(a.x, b.y)
        };
        if ahead(a, d1, corner) && ahead(b, d2, corner) {
            return Ok(vec![a, corner, b]);
        }
        let ea = step(a, d1, ext);
        let eb = step(b, d2, ext);
        let corner = if horizontal {
            Point::new(ea.x, eb.y)
        } else {
            Point::new(eb.x, ea.y)
        };
        return Ok(vec![a, ea, corner, eb, b]);
    }

    if lateral.abs() < ext {
        return Err(LayoutError::Routing(format!(
            "ports at ({:.3}, {:.3}) and ({:.3}, {:.3}) are too close sideways to turn around",
            a.x, a.y, b.x, b.y
        )));
    }

    if same {
        // U turn beyond whichever port sticks out further.
        let reach = dot((a.x, a.y), d1).max(dot((b.x, b.y), d1)) + ext;
        let (ea, eb) = if horizontal {
            let x = reach * d1.0;
            (Point::new(x, a.y), Point::new(x, b.y))
        } else {
            let y = reach * d1.1;
            (Point::new(a.x, y), Point::new(b.x, y))
        };
        return Ok(vec![a, ea, eb, b]);
    }

    // Facing away from each other: step out of both ports and cross over midway.
    let ea = step(a, d1, ext);
    let eb = step(b, d2, ext);
    let (p, q) = if horizontal {
        let my = (a.y + b.y) / 2.0;
        (Point::new(ea.x, my), Point::new(eb.x, my))
    } else {
        let mx = (a.x + b.x) / 2.0;
        (Point::new(mx, ea.y), Point::new(mx, eb.y))
    };
    Ok(vec![a, ea, p, q, eb, b])
}

/// Route a trace from `port1` to `port2` and add it to `cell`.
///
/// The trace leaves `port1` in the port's orientation and enters `port2`
/// against its orientation, so two ports facing each other are joined
/// directly.
pub fn route_single(cell: &mut Cell, port1: &Port, port2: &Port, xs: &CrossSection) -> Result<Route> {
    check_layer(port1, xs)?;
    check_layer(port2, xs)?;
    let not_manhattan = |p: &Port| {
        LayoutError::Routing(format!(
            "port '{}' has non-Manhattan orientation {}",
            p.name, p.orientation
        ))
    };
    let d1 = port1.direction().ok_or_else(|| not_manhattan(port1))?;
    let d2 = port2.direction().ok_or_else(|| not_manhattan(port2))?;

    let points = simplify(waypoints(port1.center, d1, port2.center, d2, xs.width)?);
    if points.len() < 2 {
        return Err(LayoutError::Routing(format!(
            "ports '{}' and '{}' coincide",
            port1.name, port2.name
        )));
    }
    let path = Path::new(xs.layer, points, xs.width);
    cell.add_geometry(GeomPrimitive::Path(path.clone()));
    Ok(Route { path })
}

/// Which side of the channel a pin enters from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Top,
    Bottom,
}

/// Which end of the channel an exiting track runs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    West,
    East,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPin {
    pub net: String,
    pub side: Side,
    pub x: f64,
    /// Pin edge for top pins. Bottom pins end on the channel's bottom edge.
    pub y: f64,
    pub layer: LayerId,
}

impl ChannelPin {
    /// A south-facing port above the channel.
    pub fn top(net: &str, port: &Port) -> Result<Self> {
        if port.direction() != Some((0.0, -1.0)) {
            return Err(LayoutError::Routing(format!(
                "top pin '{}' must face south, faces {}",
                port.name, port.orientation
            )));
        }
        Ok(Self {
            net: net.to_string(),
            side: Side::Top,
            x: port.center.x,
            y: port.center.y,
            layer: port.layer,
        })
    }

    /// A pin at `x` below the channel, to be met at the channel's bottom edge.
    pub fn bottom(net: &str, x: f64, layer: LayerId) -> Self {
        Self {
            net: net.to_string(),
            side: Side::Bottom,
            x,
            y: f64::NAN,
            layer,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelExit {
    pub net: String,
    pub edge: Edge,
    pub x: f64,
}

#[derive(Debug, Clone)]
pub struct Channel {
    pub horizontal: CrossSection,
    pub vertical: CrossSection,
    /// Square via joining the two routing layers, centred on its own origin or not.
    pub via: Arc<Cell>,
    pub spacing: f64,
    pub pins: Vec<ChannelPin>,
    pub exits: Vec<ChannelExit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRoute {
    /// Track centre line per net, top to bottom.
    pub tracks: Vec<(String, f64)>,
    /// Lowest top-pin edge; tracks start below it.
    pub top: f64,
    /// Bottom edge, where bottom pins are met.
    pub bottom: f64,
    /// Ports for bottom pins (facing south) and exits (facing west or east).
    pub ports: Vec<Port>,
}

impl ChannelRoute {
    pub fn track_y(&self, net: &str) -> Option<f64> {
        self.tracks.iter().find(|(n, _)| n == net).map(|(_, y)| *y)
    }
}

/// Order nets top to bottom so that, in any column shared by a top pin of
/// net `a` and a bottom pin of net `b`, `a`'s track lies above `b`'s.
fn order_tracks(nets: &[String], channel: &Channel, column: f64) -> Result<Vec<usize>> {
    let index: HashMap<&str, usize> = nets
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();
    let mut above: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nets.len()];
    let pins = &channel.pins;
    for (i, p) in pins.iter().enumerate() {
        for q in &pins[i + 1..] {
            if p.net == q.net || (p.x - q.x).abs() >= column - EPSILON {
                continue;
            }
            let (pi, qi) = (index[p.net.as_str()], index[q.net.as_str()]);
            match (p.side, q.side) {
                (Side::Top, Side::Bottom) => {
                    above[pi].insert(qi);
                }
                (Side::Bottom, Side::Top) => {
                    above[qi].insert(pi);
                }
                _ => {
                    return Err(LayoutError::Routing(format!(
                        "pins of nets '{}' and '{}' are {:.3} apart, need {:.3}",
                        p.net,
                        q.net,
                        (p.x - q.x).abs(),
                        column
                    )))
                }
            }
        }
    }

    let mut indegree = vec![0usize; nets.len()];
    for below in &above {
        for &b in below {
            indegree[b] += 1;
        }
    }
    let mut ready: BTreeSet<usize> = (0..nets.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(nets.len());
    while let Some(n) = ready.pop_first() {
        order.push(n);
        for &b in &above[n] {
            indegree[b] -= 1;
            if indegree[b] == 0 {
                ready.insert(b);
            }
        }
    }
    if order.len() != nets.len() {
        return Err(LayoutError::Routing(
            "cyclic vertical constraints between channel nets".to_string(),
        ));
    }
    Ok(order)
}

fn unique_port_name(used: &mut HashMap<String, usize>, net: &str) -> String {
    let count = used.entry(net.to_string()).or_insert(0);
    *count += 1;
    if *count == 1 {
        net.to_string()
    } else {
        format!("{}_{}", net, count)
    }
}

/// Route every net of `channel` and add the traces and vias to `cell`.
pub fn route_channel(cell: &mut Cell, channel: &Channel) -> Result<ChannelRoute> {
    let h = &channel.horizontal;
    let v = &channel.vertical;
    let via_bb = channel
        .via
        .bbox()
        .ok_or_else(|| LayoutError::Routing(format!("via '{}' is empty", channel.via.name)))?;
    let (vw, vh) = (via_bb.width(), via_bb.height());
    let needs_via = h.layer != v.layer;

    let top = channel
        .pins
        .iter()
        .filter(|p| p.side == Side::Top)
        .map(|p| p.y)
        .reduce(f64::min)
        .ok_or_else(|| LayoutError::Routing("channel needs at least one top pin".to_string()))?;

    let mut nets: Vec<String> = Vec::new();
    for p in &channel.pins {
        if p.layer != h.layer && p.layer != v.layer {
            return Err(LayoutError::LayerMismatch {
                port: p.net.clone(),
                port_layer: p.layer,
                route_layer: v.layer,
            });
        }
        if !nets.contains(&p.net) {
            nets.push(p.net.clone());
        }
    }
    if let Some(exit) = channel.exits.iter().find(|e| !nets.contains(&e.net)) {
        return Err(LayoutError::Routing(format!(
            "exit for net '{}' which has no pins",
            exit.net
        )));
    }

    let column = v.width.max(vw) + channel.spacing;
    let order = order_tracks(&nets, channel, column)?;

    let track_w = h.width.max(vh);
    let pitch = track_w + channel.spacing;
    let first = top - vh - channel.spacing - track_w / 2.0;
    let mut track_y = vec![0.0; nets.len()];
    for (k, &n) in order.iter().enumerate() {
        track_y[n] = first - k as f64 * pitch;
    }
    let last = first - (order.len() as f64 - 1.0) * pitch;
    let bottom = last - track_w / 2.0 - channel.spacing - vh;

    let place_via = |cell: &mut Cell, center: Point| {
        let mut inst = CellInstance::new(channel.via.clone());
        inst.set_center(center);
        cell.add_instance(inst);
    };

    let mut spans: Vec<Vec<f64>> = vec![Vec::new(); nets.len()];
    let mut used = HashMap::new();
    let mut ports = Vec::new();
    for p in &channel.pins {
        let n = nets.iter().position(|x| *x == p.net).unwrap_or_default();
        let y_track = track_y[n];
        let via_at_pin = needs_via && p.layer == h.layer;
        let end = match p.side {
            Side::Top if via_at_pin => {
                let c = Point::new(p.x, p.y - vh / 2.0);
                place_via(cell, c);
                c.y
            }
            Side::Top => p.y,
            Side::Bottom if via_at_pin => {
                let c = Point::new(p.x, bottom + vh / 2.0);
                place_via(cell, c);
                c.y
            }
            Side::Bottom => bottom,
        };
        cell.add_geometry(GeomPrimitive::Path(Path::new(
            v.layer,
            vec![Point::new(p.x, end), Point::new(p.x, y_track)],
            v.width,
        )));
        if needs_via {
            place_via(cell, Point::new(p.x, y_track));
        }
        if p.side == Side::Bottom {
            let width = if via_at_pin { vw } else { v.width };
            let name = unique_port_name(&mut used, &p.net);
            ports.push(Port::new(&name, Point::new(p.x, bottom), 270.0, width, p.layer));
        }
        spans[n].push(p.x);
    }

    for exit in &channel.exits {
        let n = nets.iter().position(|x| *x == exit.net).unwrap_or_default();
        spans[n].push(exit.x);
        let orientation = match exit.edge {
            Edge::West => 180.0,
            Edge::East => 0.0,
        };
        let name = unique_port_name(&mut used, &exit.net);
        ports.push(Port::new(
            &name,
            Point::new(exit.x, track_y[n]),
            orientation,
            h.width,
            h.layer,
        ));
    }

    for (n, xs) in spans.iter().enumerate() {
        let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if hi - lo > EPSILON {
            cell.add_geometry(GeomPrimitive::Path(Path::new(
                h.layer,
                vec![Point::new(lo, track_y[n]), Point::new(hi, track_y[n])],
                h.width,
            )));
        }
    }

    log::debug!(
        "channel in '{}': {} nets, {} pins, bottom at {:.3}",
        cell.name,
        nets.len(),
        channel.pins.len(),
        bottom
    );

    Ok(ChannelRoute {
        tracks: order.iter().map(|&n| (nets[n].clone(), track_y[n])).collect(),
        top,
        bottom,
        ports,
    })
}
