use bistro_inn::{
    availability::conflicts_for, is_room_available, Booking, BookingStatus, Catalog, StayRange,
};
use chrono::{Duration, NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{seq::SliceRandom, thread_rng, Rng};

const STATUSES: [BookingStatus; 4] = [
    BookingStatus::Pending,
    BookingStatus::Confirmed,
    BookingStatus::Cancelled,
    BookingStatus::Completed,
];

fn random_bookings(count: usize) -> Vec<Booking> {
    let catalog = Catalog::seeded();
    let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let mut rng = thread_rng();

    (0..count)
        .map(|i| {
            let room = catalog.rooms().choose(&mut rng).unwrap().clone();
            let check_in = base + Duration::days(rng.gen_range(0..365));
            let check_out = check_in + Duration::days(rng.gen_range(1..14));
            Booking {
                id: i as u64 + 1,
                user_id: 2,
                total_price: room.price,
                room,
                check_in_date: check_in,
                check_out_date: check_out,
                guest_name: format!("guest{}", i),
                guest_email: format!("guest{}@example.com", i),
                guest_phone: "555-0100".to_string(),
                num_guests: 1,
                special_requests: None,
                status: *STATUSES.choose(&mut rng).unwrap(),
                created_at: Utc::now(),
            }
        })
        .collect()
}

fn random_stays(count: usize) -> Vec<(u64, StayRange)> {
    let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let mut rng = thread_rng();
    (0..count)
        .map(|_| {
            let check_in = base + Duration::days(rng.gen_range(0..365));
            let nights = rng.gen_range(1..10);
            let range = StayRange::new(check_in, check_in + Duration::days(nights)).unwrap();
            (rng.gen_range(1..=5), range)
        })
        .collect()
}

pub fn availability_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("room_availability");

    // Scan cost as the booking history grows
    for size in [100usize, 1_000, 10_000].iter() {
        let bookings = random_bookings(*size);
        let stays = random_stays(256);

        group.bench_with_input(BenchmarkId::new("is_room_available", size), size, |b, _| {
            b.iter(|| {
                let free = stays
                    .iter()
                    .filter(|(room_id, range)| is_room_available(*room_id, range, bookings.iter()))
                    .count();
                black_box(free)
            });
        });

        group.bench_with_input(BenchmarkId::new("conflicts_for", size), size, |b, _| {
            b.iter(|| {
                let conflicts: usize = stays
                    .iter()
                    .map(|(room_id, range)| conflicts_for(*room_id, range, bookings.iter()).count())
                    .sum();
                black_box(conflicts)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, availability_benchmark);
criterion_main!(benches);
