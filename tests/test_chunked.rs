use laz_point10::las::chunked::{
    compress_buffer, compress_chunk, compress_points, decompress_buffer, decompress_chunk,
    decompress_chunks, ChunkConfigBuilder, CompressedChunk,
};
use laz_point10::packers::Packable;
use laz_point10::{LazError, Point10};

fn scan(count: i32) -> Vec<Point10> {
    (0..count)
        .map(|i| Point10 {
            x: 1_000_000 + i * 7,
            y: 2_000_000 - (i % 500) * 11,
            z: 300 + (i % 13) - (i % 7),
            intensity: (i * 37 % 4096) as u16,
            return_number: (i % 4 + 1) as u8,
            number_of_returns_of_given_pulse: 4,
            scan_direction_flag: (i / 500) % 2 == 0,
            edge_of_flight_line: i % 500 == 0,
            classification: if i % 10 == 0 { 6 } else { 2 },
            scan_angle_rank: ((i % 500) / 10 - 25) as i8,
            user_data: 0,
            point_source_id: (i / 2000) as u16,
        })
        .collect()
}

fn pack(points: &[Point10]) -> Vec<u8> {
    let mut buffer = vec![0u8; points.len() * Point10::SIZE];
    for (point, output) in points.iter().zip(buffer.chunks_exact_mut(Point10::SIZE)) {
        point.pack_into(output);
    }
    buffer
}

#[test]
fn test_points_round_trip_through_chunks() {
    let points = scan(12_345);
    let config = ChunkConfigBuilder::new()
        .with_chunk_size(5_000)
        .build()
        .unwrap();
    let chunks = compress_points(&points, &config).unwrap();
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[2].point_count, 2_345);

    let compressed_size: usize = chunks.iter().map(|c| c.data.len()).sum();
    assert!(compressed_size < points.len() * Point10::SIZE / 2);

    assert_eq!(decompress_chunks(&chunks).unwrap(), points);
}

#[test]
fn test_chunks_are_independent() {
    let points = scan(3_000);
    let config = ChunkConfigBuilder::new()
        .with_chunk_size(1_000)
        .build()
        .unwrap();
    let chunks = compress_points(&points, &config).unwrap();

    // each chunk is the same as if it was compressed alone
    assert_eq!(chunks[1], compress_chunk(&points[1_000..2_000]).unwrap());
    assert_eq!(
        decompress_chunk(&chunks[2]).unwrap(),
        points[2_000..].to_vec()
    );
}

#[test]
fn test_buffer_round_trip() {
    let points = scan(2_500);
    let buffer = pack(&points);
    let config = ChunkConfigBuilder::new()
        .with_chunk_size(1_000)
        .build()
        .unwrap();

    let chunks = compress_buffer(&buffer, &config).unwrap();
    assert_eq!(chunks, compress_points(&points, &config).unwrap());

    let mut output = vec![0u8; buffer.len()];
    decompress_buffer(&chunks, &mut output).unwrap();
    assert_eq!(output, buffer);
}

#[test]
fn test_corrupted_chunk_is_an_error() {
    let points = scan(1_000);
    let mut chunk = compress_chunk(&points).unwrap();
    let len = chunk.data.len();
    chunk.data.truncate(len / 2);
    assert!(decompress_chunk(&chunk).is_err());

    let chunk = CompressedChunk {
        point_count: 10,
        data: vec![],
    };
    assert!(matches!(
        decompress_chunk(&chunk),
        Err(LazError::UnexpectedEndOfStream)
    ));
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_is_the_same_as_sequential() {
    use laz_point10::{par_compress_points, par_decompress_chunks};

    let points = scan(20_000);
    let config = ChunkConfigBuilder::new()
        .with_chunk_size(3_000)
        .build()
        .unwrap();

    let chunks = compress_points(&points, &config).unwrap();
    let par_chunks = par_compress_points(&points, &config).unwrap();
    assert_eq!(chunks, par_chunks);

    assert_eq!(par_decompress_chunks(&par_chunks).unwrap(), points);
}
