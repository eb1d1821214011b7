// Случайные идентификаторы под корнем основного хоста: to_primary(to_backup(x)) == x.
// Суффикс после корня начинается с `/` или `@` (или пуст), как у настоящих имён ZFS.

use oorandom::Rand32;

use snapmirror::NameMapper;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789-_.:/@";

fn random_tail(rng: &mut Rand32) -> String {
    let len = rng.rand_range(0..24) as usize;
    (0..len)
        .map(|_| ALPHABET[rng.rand_range(0..ALPHABET.len() as u32) as usize] as char)
        .collect()
}

/// Empty, `/child...` or `@tag...`.
fn random_suffix(rng: &mut Rand32) -> String {
    match rng.rand_range(0..5) {
        0 => String::new(),
        1 => format!("@{}", random_tail(rng)),
        _ => format!("/{}", random_tail(rng)),
    }
}

#[test]
fn roundtrip_for_ids_under_primary_root() {
    let mut rng = Rand32::new(0x5eed_2024);
    let pairs = [("tank", "pool2"), ("tank", "tank-backup"), ("a", "b/c")];

    for (primary, backup) in pairs {
        let m = NameMapper::new(primary, backup);
        for _ in 0..500 {
            let id = format!("{}{}", primary, random_suffix(&mut rng));
            let mapped = m.to_backup(&id).expect("under primary root");
            assert!(mapped.starts_with(backup));
            assert_eq!(m.to_primary(&mapped).expect("under backup root"), id);
        }
    }
}

#[test]
fn ids_outside_root_never_map() {
    let mut rng = Rand32::new(7);
    let m = NameMapper::new("tank", "pool2");
    for _ in 0..200 {
        let id = format!("rpool{}", random_suffix(&mut rng));
        assert!(m.to_backup(&id).is_err(), "{id} must not map");
    }
}

#[test]
fn pools_sharing_the_root_prefix_never_map() {
    let mut rng = Rand32::new(0x7a2c);
    let m = NameMapper::new("tank", "pool2");
    for _ in 0..200 {
        // tank2, tank-old, tank_x ...: another pool, not a child of tank
        let pool = format!("tank{}", ["2", "-old", "_x", "x"][rng.rand_range(0..4) as usize]);
        let id = format!("{}{}", pool, random_suffix(&mut rng));
        assert!(m.to_backup(&id).is_err(), "{id} must not map");
    }
}
