//! Window swallowing.
//!
//! A terminal that launches a graphical program hands its place on screen to
//! that program's window until it exits. The terminal keeps its slot in the
//! client lists; only the window shown in it changes.
use std::{fs, path::PathBuf};

use crate::{
    client::{Client, ClientId},
    registry::Registry,
    xconnection::Xid,
};

/// Ancestor walks give up after this many hops.
const MAX_DEPTH: usize = 64;

/// Read only view of the OS process tree.
pub trait ProcessTable {
    fn parent(&self, pid: u32) -> Option<u32>;
}

/// [ProcessTable] backed by `/proc/<pid>/stat`.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> ProcFs {
        ProcFs {
            root: PathBuf::from("/proc"),
        }
    }
}

/// The ppid field of a stat line. The command name may itself contain
/// spaces and parentheses, so fields are counted from the last `)`.
pub fn parse_stat_ppid(stat: &str) -> Option<u32> {
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().nth(1)?.parse().ok()
}

impl ProcessTable for ProcFs {
    fn parent(&self, pid: u32) -> Option<u32> {
        let path = self.root.join(pid.to_string()).join("stat");
        match fs::read_to_string(&path) {
            Ok(stat) => parse_stat_ppid(&stat),
            Err(e) => {
                trace!("unable to read {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// True when `pid` is a strict descendant of `ancestor`.
pub fn is_descendant(procs: &dyn ProcessTable, ancestor: u32, pid: u32) -> bool {
    if ancestor == 0 || pid == 0 || ancestor == pid {
        return false;
    }
    let mut current = pid;
    for _ in 0..MAX_DEPTH {
        match procs.parent(current) {
            Some(p) if p == ancestor => return true,
            Some(p) if p > 1 && p != current => current = p,
            _ => return false,
        }
    }
    false
}

/// The managed terminal that `child` should replace, if any.
pub fn terminal_for(reg: &Registry, procs: &dyn ProcessTable, child: &Client) -> Option<ClientId> {
    if child.pid == 0 || child.terminal || child.no_swallow {
        return None;
    }
    reg.managed().into_iter().find(|&id| {
        reg.get(id).map_or(false, |t| {
            t.terminal && t.swallowed.is_none() && is_descendant(procs, t.pid, child.pid)
        })
    })
}

/// Put `child` in the terminal's slot.
///
/// The terminal's own state is kept as the slot's swallowed record. Returns
/// the terminal's window, which the caller hides.
pub fn swallow(reg: &mut Registry, term: ClientId, child: Client) -> Option<Xid> {
    let t = reg.get_mut(term)?;
    let saved = t.clone();
    t.win = child.win;
    t.title = child.title;
    t.class = child.class;
    t.instance = child.instance;
    t.pid = child.pid;
    t.hints = child.hints;
    t.fixed = child.fixed;
    t.never_focus = child.never_focus;
    t.urgent = child.urgent;
    t.swallowed = Some(Box::new(saved));
    info!("window {} swallowed terminal window {}", t.win, saved_win(t));
    Some(saved_win(t))
}

fn saved_win(c: &Client) -> Xid {
    c.swallowed.as_ref().map_or(0, |s| s.win)
}

/// Give the slot back to the terminal. Returns the terminal's window, which
/// the caller shows again.
pub fn unswallow(reg: &mut Registry, id: ClientId) -> Option<Xid> {
    let c = reg.get_mut(id)?;
    let saved = c.swallowed.take()?;
    c.win = saved.win;
    c.title = saved.title;
    c.class = saved.class;
    c.instance = saved.instance;
    c.pid = saved.pid;
    c.hints = saved.hints;
    c.fixed = saved.fixed;
    c.never_focus = saved.never_focus;
    c.urgent = saved.urgent;
    info!("terminal window {} restored", c.win);
    Some(c.win)
}

/// The terminal died while swallowed: forget it and keep the child in the slot.
pub fn forget_swallowed(reg: &mut Registry, id: ClientId) -> bool {
    reg.get_mut(id).and_then(|c| c.swallowed.take()).is_some()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        geometry::Rectangle,
        layout::{Layout, LayoutKind},
        monitor::{Monitor, MonitorDefaults},
        tag::TagSet,
    };
    use std::collections::HashMap;

    /// pid -> ppid
    #[derive(Default)]
    pub struct FakeProcs(pub HashMap<u32, u32>);

    impl ProcessTable for FakeProcs {
        fn parent(&self, pid: u32) -> Option<u32> {
            self.0.get(&pid).copied()
        }
    }

    fn registry() -> Registry {
        let defaults = MonitorDefaults {
            mfact: 0.5,
            nmaster: 1,
            show_bar: true,
            top_bar: true,
            layouts: [
                Layout::new("[]=", LayoutKind::Tile),
                Layout::new("><>", LayoutKind::Floating),
            ],
        };
        Registry::new(vec![Monitor::new(0, Rectangle::new(0, 0, 1000, 800), &defaults, 20)])
    }

    fn terminal(reg: &mut Registry, win: Xid, pid: u32) -> ClientId {
        let mut c = Client::new(win, Rectangle::new(20, 40, 400, 300), 1);
        c.title = "st".into();
        c.pid = pid;
        c.terminal = true;
        c.tags = TagSet::from_bits(0b101);
        let id = reg.insert(c);
        reg.attach(id);
        reg.attach_stack(id);
        id
    }

    fn child(win: Xid, pid: u32) -> Client {
        let mut c = Client::new(win, Rectangle::new(0, 0, 10, 10), 1);
        c.title = "mpv".into();
        c.pid = pid;
        c
    }

    #[test]
    fn stat_ppid_survives_odd_command_names() {
        assert_eq!(parse_stat_ppid("123 (st) S 45 123 123 0"), Some(45));
        assert_eq!(parse_stat_ppid("9 (a) b (c)) R 7 9"), Some(7));
        assert_eq!(parse_stat_ppid("garbage"), None);
    }

    #[test]
    fn descent_is_strict_and_bounded() {
        let procs = FakeProcs([(300, 200), (200, 100), (100, 1)].into_iter().collect());
        assert!(is_descendant(&procs, 100, 300));
        assert!(!is_descendant(&procs, 100, 100));
        assert!(!is_descendant(&procs, 300, 100));

        // a cycle must not hang
        let looped = FakeProcs([(5, 6), (6, 5)].into_iter().collect());
        assert!(!is_descendant(&looped, 99, 5));
    }

    #[test]
    fn only_terminals_with_a_free_slot_swallow() {
        let mut reg = registry();
        let procs = FakeProcs([(300, 100)].into_iter().collect());
        let t = terminal(&mut reg, 10, 100);

        assert_eq!(terminal_for(&reg, &procs, &child(20, 300)), Some(t));

        let mut opted_out = child(20, 300);
        opted_out.no_swallow = true;
        assert_eq!(terminal_for(&reg, &procs, &opted_out), None);

        let mut term_child = child(20, 300);
        term_child.terminal = true;
        assert_eq!(terminal_for(&reg, &procs, &term_child), None);

        swallow(&mut reg, t, child(20, 300));
        assert_eq!(terminal_for(&reg, &procs, &child(30, 300)), None);
    }

    #[test]
    fn swallow_round_trip_restores_the_terminal() {
        let mut reg = registry();
        let t = terminal(&mut reg, 10, 100);
        let before = reg.get(t).cloned();

        assert_eq!(swallow(&mut reg, t, child(20, 300)), Some(10));
        let slot = reg.get(t).cloned().unwrap();
        assert_eq!(slot.win, 20);
        assert_eq!(slot.title, "mpv");
        assert_eq!(slot.tags, TagSet::from_bits(0b101));
        assert_eq!(reg.win_to_client(20), Some(t));
        assert_eq!(reg.swallowing_client(10), Some(t));
        assert_eq!(reg.monitors[0].clients, vec![t]);

        assert_eq!(unswallow(&mut reg, t), Some(10));
        assert_eq!(reg.get(t).cloned(), before);
        assert_eq!(unswallow(&mut reg, t), None);
    }

    #[test]
    fn dead_terminal_leaves_child_in_place() {
        let mut reg = registry();
        let t = terminal(&mut reg, 10, 100);
        swallow(&mut reg, t, child(20, 300));
        assert!(forget_swallowed(&mut reg, t));
        assert_eq!(reg.get(t).map(|c| c.win), Some(20));
        assert_eq!(reg.swallowing_client(10), None);
        assert!(!forget_swallowed(&mut reg, t));
    }
}
